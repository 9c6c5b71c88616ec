use crate::core::{
    entities::{
        Audio, Comment, CreateMedia, CreatePost, CreateUser, Hashtag, Media,
        Photo, Post, Profile, UpdateMedia, UpdatePost, UpdateProfile,
        UpdateUser, User, Video,
    },
    error::Result,
};

/// Number of liked hashtags the recommendation feed ranks by.
pub const TOP_HASHTAGS: i64 = 5;

pub trait UserRepository {
    async fn create_user(&self, user: &CreateUser) -> Result<()>;
    async fn get_user(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn get_password_hash(&self, username: &str)
        -> Result<Option<String>>;
    async fn update_user(&self, username: &str, update: &UpdateUser)
        -> Result<()>;
    async fn delete_user(&self, username: &str) -> Result<()>;

    async fn create_profile(&self, profile: &Profile) -> Result<()>;
    async fn get_profile(&self, username: &str) -> Result<Option<Profile>>;
    async fn list_profiles(&self) -> Result<Vec<Profile>>;
    async fn update_profile(
        &self,
        username: &str,
        update: &UpdateProfile,
    ) -> Result<()>;
    /// Applies profile and account changes together: either both are
    /// written or neither is.
    async fn update_account(
        &self,
        username: &str,
        profile: &UpdateProfile,
        user: &UpdateUser,
    ) -> Result<()>;

    async fn follow(&self, follower: &str, followee: &str) -> Result<()>;
    async fn unfollow(&self, follower: &str, followee: &str) -> Result<()>;
    async fn followers(&self, username: &str) -> Result<Vec<String>>;
    async fn following(&self, username: &str) -> Result<Vec<String>>;
}

pub trait PostRepository {
    async fn create_post(&self, post: &CreatePost) -> Result<i64>;
    async fn get_post(&self, post_id: i64) -> Result<Option<Post>>;
    async fn posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>>;
    async fn user_posts(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;
    async fn post_count(&self, username: &str) -> Result<i64>;
    async fn posts_by_hashtags(&self, hashtags: &[String]) -> Result<Vec<Post>>;
    async fn home_feed(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;
    async fn recommended_feed(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;
    async fn update_post(&self, post_id: i64, update: &UpdatePost)
        -> Result<()>;
    /// Deletes the post and returns the media rows that were attached to it.
    async fn delete_post(&self, post_id: i64) -> Result<Vec<Media>>;
    async fn hashtags_for_posts(&self, post_ids: &[i64])
        -> Result<Vec<Hashtag>>;

    /// Returns the post's like count after the change.
    async fn like_post(&self, username: &str, post_id: i64) -> Result<i32>;
    async fn unlike_post(&self, username: &str, post_id: i64) -> Result<i32>;
    async fn liked_users(&self, post_id: i64) -> Result<Vec<String>>;
    async fn liked_posts(&self, username: &str) -> Result<Vec<i64>>;

    async fn create_comment(
        &self,
        username: &str,
        post_id: i64,
        text: &str,
    ) -> Result<i64>;
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>>;
    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;
    async fn comments_by_user(&self, username: &str) -> Result<Vec<Comment>>;
    async fn comment_count(&self, post_id: i64) -> Result<i64>;
    async fn update_comment(&self, comment_id: i64, text: &str) -> Result<()>;
    async fn delete_comment(&self, comment_id: i64) -> Result<()>;
}

pub trait MediaRepository {
    async fn create_media(&self, media: &CreateMedia) -> Result<i64>;
    async fn get_media(&self, media_id: i64) -> Result<Option<Media>>;
    async fn media_by_post(&self, post_id: i64) -> Result<Vec<Media>>;
    async fn media_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Media>>;
    async fn update_media(&self, media_id: i64, update: &UpdateMedia)
        -> Result<()>;
    async fn delete_media(&self, media_id: i64) -> Result<()>;

    async fn create_photo(&self, photo: &Photo) -> Result<()>;
    async fn get_photo(&self, media_id: i64) -> Result<Option<Photo>>;
    async fn create_video(&self, video: &Video) -> Result<()>;
    async fn get_video(&self, media_id: i64) -> Result<Option<Video>>;
    async fn create_audio(&self, audio: &Audio) -> Result<()>;
    async fn get_audio(&self, media_id: i64) -> Result<Option<Audio>>;
}
