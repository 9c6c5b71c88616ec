//! Media metadata read from local files before they are recorded.

use crate::core::{
    entities::MediaType,
    error::{Error, Result},
};
use actix_web::web;
use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use std::path::{Path, PathBuf};
use symphonia::core::{
    codecs::CODEC_TYPE_NULL, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MediaMetadata {
    Photo { width: i32, height: i32 },
    Video { duration: f64, width: i32, height: i32 },
    Audio { duration: f64, bitrate: i32 },
}

const FFPROBE: &str = "ffprobe";

pub(crate) async fn extract(
    media_type: MediaType,
    path: &Path,
) -> Result<MediaMetadata> {
    let owned: PathBuf = path.to_owned();
    let result = match media_type {
        MediaType::Photo => web::block(move || photo_metadata(&owned))
            .await
            .map_err(|e| Error::wrap("metadata worker failed".into(), 500, e.to_string()))?,
        MediaType::Audio => web::block(move || audio_metadata(&owned))
            .await
            .map_err(|e| Error::wrap("metadata worker failed".into(), 500, e.to_string()))?,
        MediaType::Video => return video_metadata(FFPROBE, path).await,
    };
    result.map_err(|e| unreadable(media_type, e))
}

fn unreadable(media_type: MediaType, err: anyhow::Error) -> Error {
    Error::wrap(format!("failed to read {} metadata", media_type), 400, err)
}

fn photo_metadata(path: &Path) -> anyhow::Result<MediaMetadata> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed to read image: {}", path.display()))?;
    Ok(MediaMetadata::Photo {
        width: i32::try_from(width)?,
        height: i32::try_from(height)?,
    })
}

fn audio_metadata(path: &Path) -> anyhow::Result<MediaMetadata> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;
    let size = file.metadata()?.len();
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("failed to probe audio file: {}", path.display()))?;

    let format = probed.format;
    let track = format
        .default_track()
        .or_else(|| {
            format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        })
        .ok_or_else(|| anyhow!("no audio track found"))?;

    let params = &track.codec_params;
    let duration = match (params.n_frames, params.time_base, params.sample_rate) {
        (Some(frames), Some(time_base), _) => {
            let time = time_base.calc_time(frames);
            time.seconds as f64 + time.frac
        }
        (Some(frames), None, Some(rate)) if rate > 0 => frames as f64 / rate as f64,
        _ => bail!("audio duration is unknown"),
    };

    Ok(MediaMetadata::Audio {
        duration,
        bitrate: bitrate_kbps(size, duration),
    })
}

fn bitrate_kbps(size_bytes: u64, duration_secs: f64) -> i32 {
    if duration_secs <= 0.0 {
        return 0;
    }
    (size_bytes as f64 * 8.0 / duration_secs / 1000.0).round() as i32
}

/// A missing `ffprobe` is a server fault; output it cannot parse means the
/// upload is not a readable video.
async fn video_metadata(ffprobe: &str, path: &Path) -> Result<MediaMetadata> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-show_entries", "format=duration", "-show_streams", "-of", "json"])
        .arg(path)
        .output()
        .await
        .map_err(|e| Error::wrap(format!("failed to run {}", ffprobe), 500, e))?;
    if !output.status.success() {
        return Err(unreadable(
            MediaType::Video,
            anyhow!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    parse_ffprobe(&output.stdout).map_err(|e| unreadable(MediaType::Video, e))
}

fn parse_ffprobe(stdout: &[u8]) -> anyhow::Result<MediaMetadata> {
    let info: Value = serde_json::from_slice(stdout).context("invalid ffprobe output")?;
    let duration = info
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| match d {
            Value::String(s) => s.parse::<f64>().ok(),
            other => other.as_f64(),
        })
        .ok_or_else(|| anyhow!("ffprobe reported no duration"))?;

    let (width, height) = info
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|streams| {
            streams.iter().find(|s| {
                s.get("codec_type").and_then(|t| t.as_str()) == Some("video")
            })
        })
        .map(|s| {
            let dim = |key: &str| s.get(key).and_then(|v| v.as_i64()).unwrap_or(0) as i32;
            (dim("width"), dim("height"))
        })
        .unwrap_or((0, 0));

    Ok(MediaMetadata::Video {
        duration,
        width,
        height,
    })
}
