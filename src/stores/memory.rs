use crate::core::{
    entities::{
        normalize_hashtags, Audio, Comment, CreateMedia, CreatePost, CreateUser,
        Hashtag, Media, Photo, Post, Profile, UpdateMedia, UpdatePost,
        UpdateProfile, UpdateUser, User, Video,
    },
    error::{Error, Result},
    repository::{MediaRepository, PostRepository, UserRepository, TOP_HASHTAGS},
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct State {
    users: Vec<CreateUser>,
    profiles: Vec<Profile>,
    follows: Vec<(String, String)>,
    posts: Vec<Post>,
    hashtags: Vec<Hashtag>,
    likes: Vec<(String, i64)>,
    comments: Vec<Comment>,
    media: Vec<Media>,
    photos: Vec<Photo>,
    videos: Vec<Video>,
    audios: Vec<Audio>,
    next_post_id: i64,
    next_comment_id: i64,
    next_media_id: i64,
}

impl State {
    fn user_exists(&self, username: &str) -> bool {
        self.users.iter().any(|u| u.username == username)
    }

    fn post_mut(&mut self, post_id: i64) -> Result<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| p.post_id == post_id)
            .ok_or(Error::not_found(format!("post not found: {}", post_id)))
    }

    fn remove_media(&mut self, media_ids: &[i64]) {
        self.media.retain(|m| !media_ids.contains(&m.media_id));
        self.photos.retain(|p| !media_ids.contains(&p.media_id));
        self.videos.retain(|v| !media_ids.contains(&v.media_id));
        self.audios.retain(|a| !media_ids.contains(&a.media_id));
    }

    fn remove_posts(&mut self, post_ids: &[i64]) -> Vec<Media> {
        self.posts.retain(|p| !post_ids.contains(&p.post_id));
        self.hashtags.retain(|h| !post_ids.contains(&h.post_id));
        self.likes.retain(|(_, id)| !post_ids.contains(id));
        self.comments.retain(|c| !post_ids.contains(&c.post_id));
        let removed: Vec<Media> = self
            .media
            .iter()
            .filter(|m| post_ids.contains(&m.post_id))
            .cloned()
            .collect();
        let media_ids: Vec<i64> = removed.iter().map(|m| m.media_id).collect();
        self.remove_media(&media_ids);
        removed
    }

    fn update_user(&mut self, username: &str, update: &UpdateUser) -> Result<()> {
        if !self.user_exists(username) {
            return Err(Error::not_found(format!("user not found: {}", username)));
        }
        if let Some(new_username) = &update.new_username {
            if new_username != username && self.user_exists(new_username) {
                return Err(Error::conflict(format!(
                    "user already exists: {}",
                    new_username
                )));
            }
        }
        if let Some(email) = &update.email {
            if self
                .users
                .iter()
                .any(|u| u.username != username && &u.email == email)
            {
                return Err(Error::conflict(format!("email already in use: {}", email)));
            }
        }
        for user in self.users.iter_mut().filter(|u| u.username == username) {
            if let Some(email) = &update.email {
                user.email = email.clone();
            }
            if let Some(hash) = &update.password_hash {
                user.password_hash = hash.clone();
            }
        }
        if let Some(new_username) = &update.new_username {
            let rename = |name: &mut String| {
                if name == username {
                    *name = new_username.clone();
                }
            };
            self.users.iter_mut().for_each(|u| rename(&mut u.username));
            self.profiles.iter_mut().for_each(|p| rename(&mut p.username));
            self.follows.iter_mut().for_each(|(a, b)| {
                rename(a);
                rename(b);
            });
            self.posts.iter_mut().for_each(|p| rename(&mut p.username));
            self.likes.iter_mut().for_each(|(u, _)| rename(u));
            self.comments.iter_mut().for_each(|c| rename(&mut c.username));
        }
        Ok(())
    }

    fn update_profile(&mut self, username: &str, update: &UpdateProfile) -> Result<()> {
        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.username == username)
            .ok_or(Error::not_found(format!("profile not found: {}", username)))?;
        if let Some(name) = &update.name {
            profile.name = name.clone();
        }
        if let Some(url) = &update.profile_picture_url {
            profile.profile_picture_url = url.clone();
        }
        if let Some(bio) = &update.bio {
            profile.bio = bio.clone();
        }
        Ok(())
    }

    fn newest_first(&self, mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.post_id.cmp(&a.post_id))
        });
        posts
    }
}

fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryRepository {
    async fn create_user(&self, user: &CreateUser) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(Error::conflict(format!(
                "user already exists: {}",
                user.username
            )));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| User {
                username: u.username.clone(),
                email: u.email.clone(),
            }))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .iter()
            .map(|u| User {
                username: u.username.clone(),
                email: u.email.clone(),
            })
            .collect())
    }

    async fn get_password_hash(&self, username: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.password_hash.clone()))
    }

    async fn update_user(&self, username: &str, update: &UpdateUser) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        self.state.write().await.update_user(username, update)
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.user_exists(username) {
            return Err(Error::not_found(format!("user not found: {}", username)));
        }
        state.users.retain(|u| u.username != username);
        state.profiles.retain(|p| p.username != username);
        state.follows.retain(|(a, b)| a != username && b != username);
        state.likes.retain(|(u, _)| u != username);
        state.comments.retain(|c| c.username != username);
        let post_ids: Vec<i64> = state
            .posts
            .iter()
            .filter(|p| p.username == username)
            .map(|p| p.post_id)
            .collect();
        state.remove_posts(&post_ids);
        Ok(())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.user_exists(&profile.username) {
            return Err(Error::not_found(format!(
                "user not found: {}",
                profile.username
            )));
        }
        if state.profiles.iter().any(|p| p.username == profile.username) {
            return Err(Error::conflict(format!(
                "profile already exists: {}",
                profile.username
            )));
        }
        state.profiles.push(profile.clone());
        Ok(())
    }

    async fn get_profile(&self, username: &str) -> Result<Option<Profile>> {
        Ok(self
            .state
            .read()
            .await
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        Ok(self.state.read().await.profiles.clone())
    }

    async fn update_profile(&self, username: &str, update: &UpdateProfile) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        self.state.write().await.update_profile(username, update)
    }

    async fn update_account(
        &self,
        username: &str,
        profile: &UpdateProfile,
        user: &UpdateUser,
    ) -> Result<()> {
        if profile.is_empty() && user.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let mut state = self.state.write().await;
        let mut next = state.clone();
        if !profile.is_empty() {
            next.update_profile(username, profile)?;
        }
        if !user.is_empty() {
            next.update_user(username, user)?;
        }
        *state = next;
        Ok(())
    }

    async fn follow(&self, follower: &str, followee: &str) -> Result<()> {
        if follower == followee {
            return Err(Error::bad_request("users cannot follow themselves"));
        }
        let mut state = self.state.write().await;
        for username in [follower, followee] {
            if !state.user_exists(username) {
                return Err(Error::not_found(format!("user not found: {}", username)));
            }
        }
        if state
            .follows
            .iter()
            .any(|(a, b)| a == follower && b == followee)
        {
            return Err(Error::conflict(format!(
                "{} already follows {}",
                follower, followee
            )));
        }
        state.follows.push((follower.to_owned(), followee.to_owned()));
        Ok(())
    }

    async fn unfollow(&self, follower: &str, followee: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|(a, b)| !(a == follower && b == followee));
        if state.follows.len() == before {
            return Err(Error::not_found(format!(
                "{} does not follow {}",
                follower, followee
            )));
        }
        Ok(())
    }

    async fn followers(&self, username: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .iter()
            .filter(|(_, b)| b == username)
            .map(|(a, _)| a.clone())
            .collect())
    }

    async fn following(&self, username: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .iter()
            .filter(|(a, _)| a == username)
            .map(|(_, b)| b.clone())
            .collect())
    }
}

impl PostRepository for MemoryRepository {
    async fn create_post(&self, post: &CreatePost) -> Result<i64> {
        let mut state = self.state.write().await;
        if !state.user_exists(&post.username) {
            return Err(Error::not_found(format!("user not found: {}", post.username)));
        }
        state.next_post_id += 1;
        let post_id = state.next_post_id;
        state.posts.push(Post {
            post_id,
            username: post.username.clone(),
            description: post.description.clone(),
            audio_id: post.audio_id,
            like_count: 0,
            is_private: false,
            created_at: Utc::now(),
        });
        for hashtag in normalize_hashtags(&post.hashtags) {
            state.hashtags.push(Hashtag { post_id, hashtag });
        }
        Ok(post_id)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        Ok(self
            .state
            .read()
            .await
            .posts
            .iter()
            .find(|p| p.post_id == post_id)
            .cloned())
    }

    async fn posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let posts = state.newest_first(state.posts.clone());
        Ok(paginate(posts, limit, offset))
    }

    async fn user_posts(&self, username: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let posts = state.newest_first(
            state
                .posts
                .iter()
                .filter(|p| p.username == username)
                .cloned()
                .collect(),
        );
        Ok(paginate(posts, limit, offset))
    }

    async fn post_count(&self, username: &str) -> Result<i64> {
        Ok(self
            .state
            .read()
            .await
            .posts
            .iter()
            .filter(|p| p.username == username)
            .count() as i64)
    }

    async fn posts_by_hashtags(&self, hashtags: &[String]) -> Result<Vec<Post>> {
        let tags = normalize_hashtags(hashtags);
        if tags.is_empty() {
            return Ok(vec![]);
        }
        let state = self.state.read().await;
        let posts = state
            .posts
            .iter()
            .filter(|p| {
                state
                    .hashtags
                    .iter()
                    .any(|h| h.post_id == p.post_id && tags.contains(&h.hashtag))
            })
            .cloned()
            .collect();
        Ok(state.newest_first(posts))
    }

    async fn home_feed(&self, username: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let posts = state
            .posts
            .iter()
            .filter(|p| {
                p.username == username
                    || state
                        .follows
                        .iter()
                        .any(|(a, b)| a == username && b == &p.username)
            })
            .cloned()
            .collect();
        Ok(paginate(state.newest_first(posts), limit, offset))
    }

    async fn recommended_feed(&self, username: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let liked: Vec<i64> = state
            .likes
            .iter()
            .filter(|(u, _)| u == username)
            .map(|(_, id)| *id)
            .collect();
        let mut frequency: HashMap<&str, i64> = HashMap::new();
        for hashtag in state.hashtags.iter().filter(|h| liked.contains(&h.post_id)) {
            *frequency.entry(hashtag.hashtag.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, i64)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let top: Vec<&str> = ranked
            .into_iter()
            .take(TOP_HASHTAGS as usize)
            .map(|(tag, _)| tag)
            .collect();

        let mut candidates: Vec<(u8, &Post)> = state
            .posts
            .iter()
            .filter(|p| p.username != username)
            .map(|p| {
                let matches = state
                    .hashtags
                    .iter()
                    .any(|h| h.post_id == p.post_id && top.contains(&h.hashtag.as_str()));
                (if matches { 1 } else { 2 }, p)
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(b.1.created_at.cmp(&a.1.created_at))
                .then(b.1.post_id.cmp(&a.1.post_id))
        });
        Ok(paginate(
            candidates.into_iter().map(|(_, p)| p.clone()).collect(),
            limit,
            offset,
        ))
    }

    async fn update_post(&self, post_id: i64, update: &UpdatePost) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let mut state = self.state.write().await;
        let post = state.post_mut(post_id)?;
        if let Some(description) = &update.description {
            post.description = description.clone();
        }
        if let Some(audio_id) = update.audio_id {
            post.audio_id = Some(audio_id);
        }
        if let Some(is_private) = update.is_private {
            post.is_private = is_private;
        }
        if let Some(hashtags) = &update.hashtags {
            state.hashtags.retain(|h| h.post_id != post_id);
            for hashtag in normalize_hashtags(hashtags) {
                state.hashtags.push(Hashtag { post_id, hashtag });
            }
        }
        Ok(())
    }

    async fn delete_post(&self, post_id: i64) -> Result<Vec<Media>> {
        let mut state = self.state.write().await;
        state.post_mut(post_id)?;
        Ok(state.remove_posts(&[post_id]))
    }

    async fn hashtags_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Hashtag>> {
        Ok(self
            .state
            .read()
            .await
            .hashtags
            .iter()
            .filter(|h| post_ids.contains(&h.post_id))
            .cloned()
            .collect())
    }

    async fn like_post(&self, username: &str, post_id: i64) -> Result<i32> {
        let mut state = self.state.write().await;
        if !state.user_exists(username) {
            return Err(Error::not_found(format!("user not found: {}", username)));
        }
        if state.likes.iter().any(|(u, id)| u == username && *id == post_id) {
            state.post_mut(post_id)?;
            return Err(Error::conflict(format!(
                "{} already liked post {}",
                username, post_id
            )));
        }
        let post = state.post_mut(post_id)?;
        post.like_count += 1;
        let like_count = post.like_count;
        state.likes.push((username.to_owned(), post_id));
        Ok(like_count)
    }

    async fn unlike_post(&self, username: &str, post_id: i64) -> Result<i32> {
        let mut state = self.state.write().await;
        let before = state.likes.len();
        state
            .likes
            .retain(|(u, id)| !(u == username && *id == post_id));
        if state.likes.len() == before {
            return Err(Error::not_found(format!(
                "{} has not liked post {}",
                username, post_id
            )));
        }
        let post = state.post_mut(post_id)?;
        post.like_count = (post.like_count - 1).max(0);
        Ok(post.like_count)
    }

    async fn liked_users(&self, post_id: i64) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .likes
            .iter()
            .filter(|(_, id)| *id == post_id)
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn liked_posts(&self, username: &str) -> Result<Vec<i64>> {
        Ok(self
            .state
            .read()
            .await
            .likes
            .iter()
            .filter(|(u, _)| u == username)
            .map(|(_, id)| *id)
            .collect())
    }

    async fn create_comment(&self, username: &str, post_id: i64, text: &str) -> Result<i64> {
        let mut state = self.state.write().await;
        if !state.user_exists(username) {
            return Err(Error::not_found(format!("user not found: {}", username)));
        }
        state.post_mut(post_id)?;
        state.next_comment_id += 1;
        let comment_id = state.next_comment_id;
        state.comments.push(Comment {
            comment_id,
            username: username.to_owned(),
            post_id,
            comment_text: text.to_owned(),
            created_at: Utc::now(),
        });
        Ok(comment_id)
    }

    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        Ok(self
            .state
            .read()
            .await
            .comments
            .iter()
            .find(|c| c.comment_id == comment_id)
            .cloned())
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .state
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.comment_id);
        Ok(comments)
    }

    async fn comments_by_user(&self, username: &str) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .state
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.username == username)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.comment_id.cmp(&a.comment_id));
        Ok(comments)
    }

    async fn comment_count(&self, post_id: i64) -> Result<i64> {
        Ok(self
            .state
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .count() as i64)
    }

    async fn update_comment(&self, comment_id: i64, text: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let comment = state
            .comments
            .iter_mut()
            .find(|c| c.comment_id == comment_id)
            .ok_or(Error::not_found(format!("comment not found: {}", comment_id)))?;
        comment.comment_text = text.to_owned();
        Ok(())
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.comments.len();
        state.comments.retain(|c| c.comment_id != comment_id);
        if state.comments.len() == before {
            return Err(Error::not_found(format!("comment not found: {}", comment_id)));
        }
        Ok(())
    }
}

impl MediaRepository for MemoryRepository {
    async fn create_media(&self, media: &CreateMedia) -> Result<i64> {
        let mut state = self.state.write().await;
        state.post_mut(media.post_id)?;
        state.next_media_id += 1;
        let media_id = state.next_media_id;
        state.media.push(Media {
            media_id,
            post_id: media.post_id,
            file_name: media.file_name.clone(),
            extension_name: media.extension_name.clone(),
            media_type: media.media_type,
        });
        Ok(media_id)
    }

    async fn get_media(&self, media_id: i64) -> Result<Option<Media>> {
        Ok(self
            .state
            .read()
            .await
            .media
            .iter()
            .find(|m| m.media_id == media_id)
            .cloned())
    }

    async fn media_by_post(&self, post_id: i64) -> Result<Vec<Media>> {
        self.media_for_posts(&[post_id]).await
    }

    async fn media_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Media>> {
        Ok(self
            .state
            .read()
            .await
            .media
            .iter()
            .filter(|m| post_ids.contains(&m.post_id))
            .cloned()
            .collect())
    }

    async fn update_media(&self, media_id: i64, update: &UpdateMedia) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let mut state = self.state.write().await;
        let media = state
            .media
            .iter_mut()
            .find(|m| m.media_id == media_id)
            .ok_or(Error::not_found(format!("media not found: {}", media_id)))?;
        if let Some(file_name) = &update.file_name {
            media.file_name = file_name.clone();
        }
        if let Some(extension_name) = &update.extension_name {
            media.extension_name = extension_name.clone();
        }
        if let Some(media_type) = update.media_type {
            media.media_type = media_type;
        }
        Ok(())
    }

    async fn delete_media(&self, media_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.media.iter().any(|m| m.media_id == media_id) {
            return Err(Error::not_found(format!("media not found: {}", media_id)));
        }
        state.remove_media(&[media_id]);
        Ok(())
    }

    async fn create_photo(&self, photo: &Photo) -> Result<()> {
        let mut state = self.state.write().await;
        check_media(&state, photo.media_id, state.photos.iter().map(|p| p.media_id))?;
        state.photos.push(photo.clone());
        Ok(())
    }

    async fn get_photo(&self, media_id: i64) -> Result<Option<Photo>> {
        Ok(self
            .state
            .read()
            .await
            .photos
            .iter()
            .find(|p| p.media_id == media_id)
            .cloned())
    }

    async fn create_video(&self, video: &Video) -> Result<()> {
        let mut state = self.state.write().await;
        check_media(&state, video.media_id, state.videos.iter().map(|v| v.media_id))?;
        state.videos.push(video.clone());
        Ok(())
    }

    async fn get_video(&self, media_id: i64) -> Result<Option<Video>> {
        Ok(self
            .state
            .read()
            .await
            .videos
            .iter()
            .find(|v| v.media_id == media_id)
            .cloned())
    }

    async fn create_audio(&self, audio: &Audio) -> Result<()> {
        let mut state = self.state.write().await;
        check_media(&state, audio.media_id, state.audios.iter().map(|a| a.media_id))?;
        state.audios.push(audio.clone());
        Ok(())
    }

    async fn get_audio(&self, media_id: i64) -> Result<Option<Audio>> {
        Ok(self
            .state
            .read()
            .await
            .audios
            .iter()
            .find(|a| a.media_id == media_id)
            .cloned())
    }
}

fn check_media(
    state: &State,
    media_id: i64,
    mut existing: impl Iterator<Item = i64>,
) -> Result<()> {
    if !state.media.iter().any(|m| m.media_id == media_id) {
        return Err(Error::not_found(format!("media not found: {}", media_id)));
    }
    if existing.any(|id| id == media_id) {
        return Err(Error::conflict(format!(
            "metadata already recorded for media {}",
            media_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(repo: &MemoryRepository, username: &str) {
        repo.create_user(&CreateUser {
            username: username.into(),
            email: format!("{}@arthouse.com", username),
            password_hash: "hash".into(),
        })
        .await
        .unwrap();
    }

    async fn post(repo: &MemoryRepository, username: &str, tags: &[&str]) -> i64 {
        repo.create_post(&CreatePost {
            username: username.into(),
            description: format!("post by {}", username),
            audio_id: None,
            hashtags: tags.iter().map(|t| t.to_string()).collect(),
        })
        .await
        .unwrap()
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|p| p.post_id).collect()
    }

    #[actix_web::test]
    async fn test_duplicate_user_conflicts() {
        let repo = MemoryRepository::new();
        user(&repo, "Joe1").await;
        let err = repo
            .create_user(&CreateUser {
                username: "Joe1".into(),
                email: "other@arthouse.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code, 409);
    }

    #[actix_web::test]
    async fn test_profile_requires_user() {
        let repo = MemoryRepository::new();
        let err = repo
            .create_profile(&Profile {
                username: "ghost".into(),
                name: "Ghost".into(),
                profile_picture_url: String::new(),
                bio: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code, 404);
    }

    #[actix_web::test]
    async fn test_follow_rules() {
        let repo = MemoryRepository::new();
        user(&repo, "dog").await;
        user(&repo, "Artismo").await;
        assert_eq!(repo.follow("dog", "dog").await.unwrap_err().status_code, 400);
        assert_eq!(repo.follow("dog", "ghost").await.unwrap_err().status_code, 404);
        repo.follow("dog", "Artismo").await.unwrap();
        assert_eq!(
            repo.follow("dog", "Artismo").await.unwrap_err().status_code,
            409
        );
        assert_eq!(repo.followers("Artismo").await.unwrap(), vec!["dog"]);
        assert_eq!(repo.following("dog").await.unwrap(), vec!["Artismo"]);
        repo.unfollow("dog", "Artismo").await.unwrap();
        assert_eq!(
            repo.unfollow("dog", "Artismo").await.unwrap_err().status_code,
            404
        );
    }

    #[actix_web::test]
    async fn test_rename_user_cascades() {
        let repo = MemoryRepository::new();
        user(&repo, "Jolyne").await;
        user(&repo, "dog").await;
        repo.follow("Jolyne", "dog").await.unwrap();
        let post_id = post(&repo, "Jolyne", &[]).await;
        repo.update_user(
            "Jolyne",
            &UpdateUser {
                new_username: Some("Jojo".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.get_user("Jolyne").await.unwrap().is_none());
        assert_eq!(repo.followers("dog").await.unwrap(), vec!["Jojo"]);
        assert_eq!(repo.get_post(post_id).await.unwrap().unwrap().username, "Jojo");
        assert_eq!(
            repo.update_user("Jojo", &UpdateUser::default())
                .await
                .unwrap_err()
                .status_code,
            400
        );
    }

    #[actix_web::test]
    async fn test_delete_user_cascades() {
        let repo = MemoryRepository::new();
        user(&repo, "Joe1").await;
        user(&repo, "dog").await;
        let post_id = post(&repo, "Joe1", &["music"]).await;
        repo.like_post("dog", post_id).await.unwrap();
        repo.follow("dog", "Joe1").await.unwrap();
        repo.delete_user("Joe1").await.unwrap();
        assert!(repo.get_post(post_id).await.unwrap().is_none());
        assert!(repo.liked_posts("dog").await.unwrap().is_empty());
        assert!(repo.following("dog").await.unwrap().is_empty());
        assert_eq!(repo.delete_user("Joe1").await.unwrap_err().status_code, 404);
    }

    #[actix_web::test]
    async fn test_home_feed_contains_self_and_followees() {
        let repo = MemoryRepository::new();
        for name in ["Artismo", "dog", "Joe1"] {
            user(&repo, name).await;
        }
        repo.follow("Artismo", "dog").await.unwrap();
        let own = post(&repo, "Artismo", &[]).await;
        let followed = post(&repo, "dog", &[]).await;
        let _stranger = post(&repo, "Joe1", &[]).await;
        let newest = post(&repo, "dog", &[]).await;

        let feed = repo.home_feed("Artismo", 5, 0).await.unwrap();
        assert_eq!(ids(&feed), vec![newest, followed, own]);
        let page = repo.home_feed("Artismo", 2, 2).await.unwrap();
        assert_eq!(ids(&page), vec![own]);
    }

    #[actix_web::test]
    async fn test_recommended_feed_prefers_liked_hashtags() {
        let repo = MemoryRepository::new();
        for name in ["Artismo", "MicheleMouton", "Joe1"] {
            user(&repo, name).await;
        }
        let cars = post(&repo, "MicheleMouton", &["cars", "racing"]).await;
        let music = post(&repo, "Joe1", &["music"]).await;
        let own_cars = post(&repo, "Artismo", &["cars"]).await;
        let more_cars = post(&repo, "Joe1", &["cars"]).await;
        let latest = post(&repo, "Joe1", &["video"]).await;
        repo.like_post("Artismo", cars).await.unwrap();

        let feed = repo.recommended_feed("Artismo", 10, 0).await.unwrap();
        assert_eq!(ids(&feed), vec![more_cars, cars, latest, music]);
        assert!(!ids(&feed).contains(&own_cars));
    }

    #[actix_web::test]
    async fn test_recommended_feed_without_likes_is_recency() {
        let repo = MemoryRepository::new();
        user(&repo, "dog").await;
        user(&repo, "Joe1").await;
        let first = post(&repo, "Joe1", &["a"]).await;
        let second = post(&repo, "Joe1", &["b"]).await;
        post(&repo, "dog", &["a"]).await;
        let feed = repo.recommended_feed("dog", 10, 0).await.unwrap();
        assert_eq!(ids(&feed), vec![second, first]);
    }

    #[actix_web::test]
    async fn test_recommended_feed_keeps_top_five_hashtags() {
        let repo = MemoryRepository::new();
        user(&repo, "fan").await;
        user(&repo, "artist").await;
        // "a".."e" are liked twice, "f" once, so "f" falls out of the top five.
        for tag in ["a", "b", "c", "d", "e"] {
            for _ in 0..2 {
                let id = post(&repo, "artist", &[tag]).await;
                repo.like_post("fan", id).await.unwrap();
            }
        }
        let f = post(&repo, "artist", &["f"]).await;
        repo.like_post("fan", f).await.unwrap();
        let fresh_f = post(&repo, "artist", &["f"]).await;
        let fresh_a = post(&repo, "artist", &["a"]).await;

        let feed = repo.recommended_feed("fan", 20, 0).await.unwrap();
        assert_eq!(feed.first().unwrap().post_id, fresh_a);
        let position = |id| ids(&feed).iter().position(|p| *p == id).unwrap();
        assert!(position(fresh_f) > 10);
        assert_eq!(feed.len(), 13);
    }

    #[actix_web::test]
    async fn test_like_count_never_negative() {
        let repo = MemoryRepository::new();
        user(&repo, "Joe1").await;
        let post_id = post(&repo, "Joe1", &[]).await;
        assert_eq!(repo.like_post("Joe1", post_id).await.unwrap(), 1);
        assert_eq!(repo.like_post("Joe1", post_id).await.unwrap_err().status_code, 409);
        assert_eq!(repo.unlike_post("Joe1", post_id).await.unwrap(), 0);
        assert_eq!(repo.unlike_post("Joe1", post_id).await.unwrap_err().status_code, 404);
        assert_eq!(repo.get_post(post_id).await.unwrap().unwrap().like_count, 0);
        assert_eq!(repo.like_post("Joe1", 999).await.unwrap_err().status_code, 404);
    }

    #[actix_web::test]
    async fn test_update_post_replaces_hashtags() {
        let repo = MemoryRepository::new();
        user(&repo, "dog").await;
        let post_id = post(&repo, "dog", &["packwatch"]).await;
        repo.update_post(
            post_id,
            &UpdatePost {
                description: Some("Pucci on pack watch.".into()),
                hashtags: Some(vec!["#Dogs".into(), "dogs".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let tags = repo.hashtags_for_posts(&[post_id]).await.unwrap();
        assert_eq!(
            tags.into_iter().map(|h| h.hashtag).collect::<Vec<_>>(),
            vec!["dogs"]
        );
        assert!(repo
            .posts_by_hashtags(&["packwatch".into()])
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.posts_by_hashtags(&["DOGS".into()]).await.unwrap()[0].description,
            "Pucci on pack watch."
        );
    }

    #[actix_web::test]
    async fn test_delete_post_returns_media_and_cascades() {
        let repo = MemoryRepository::new();
        user(&repo, "Joe1").await;
        let post_id = post(&repo, "Joe1", &["video"]).await;
        let media_id = repo
            .create_media(&CreateMedia {
                post_id,
                file_name: "clip.mp4".into(),
                extension_name: "mp4".into(),
                media_type: crate::core::entities::MediaType::Video,
            })
            .await
            .unwrap();
        repo.create_video(&Video {
            media_id,
            duration: 3.0,
            width: 640,
            height: 480,
        })
        .await
        .unwrap();
        repo.create_comment("Joe1", post_id, "first").await.unwrap();

        let removed = repo.delete_post(post_id).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].media_id, media_id);
        assert!(repo.get_media(media_id).await.unwrap().is_none());
        assert!(repo.get_video(media_id).await.unwrap().is_none());
        assert_eq!(repo.comment_count(post_id).await.unwrap(), 0);
        assert_eq!(repo.delete_post(post_id).await.unwrap_err().status_code, 404);
    }

    #[actix_web::test]
    async fn test_media_metadata_rows() {
        let repo = MemoryRepository::new();
        user(&repo, "Artismo").await;
        let post_id = post(&repo, "Artismo", &[]).await;
        let media_id = repo
            .create_media(&CreateMedia {
                post_id,
                file_name: "cover.png".into(),
                extension_name: "png".into(),
                media_type: crate::core::entities::MediaType::Photo,
            })
            .await
            .unwrap();
        let photo = Photo {
            media_id,
            width: 1920,
            height: 1080,
        };
        repo.create_photo(&photo).await.unwrap();
        assert_eq!(repo.create_photo(&photo).await.unwrap_err().status_code, 409);
        assert_eq!(repo.get_photo(media_id).await.unwrap(), Some(photo));
        assert_eq!(
            repo.create_audio(&Audio {
                media_id: 42,
                duration: 1.0,
                bitrate: 128
            })
            .await
            .unwrap_err()
            .status_code,
            404
        );
        repo.update_media(
            media_id,
            &UpdateMedia {
                file_name: Some("cover2.png".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(
            repo.get_media(media_id).await.unwrap().unwrap().file_name,
            "cover2.png"
        );
        repo.delete_media(media_id).await.unwrap();
        assert!(repo.get_photo(media_id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_comments_order() {
        let repo = MemoryRepository::new();
        user(&repo, "Joe1").await;
        let post_id = post(&repo, "Joe1", &[]).await;
        let first = repo.create_comment("Joe1", post_id, "one").await.unwrap();
        let second = repo.create_comment("Joe1", post_id, "two").await.unwrap();
        let on_post: Vec<i64> = repo
            .comments_for_post(post_id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.comment_id)
            .collect();
        assert_eq!(on_post, vec![first, second]);
        let by_user: Vec<i64> = repo
            .comments_by_user("Joe1")
            .await
            .unwrap()
            .iter()
            .map(|c| c.comment_id)
            .collect();
        assert_eq!(by_user, vec![second, first]);
        repo.update_comment(first, "edited").await.unwrap();
        assert_eq!(
            repo.get_comment(first).await.unwrap().unwrap().comment_text,
            "edited"
        );
        repo.delete_comment(first).await.unwrap();
        assert_eq!(repo.delete_comment(first).await.unwrap_err().status_code, 404);
    }
}
