use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod auth;
mod blog;
mod comment;
mod error;
mod notification;
mod store;
mod user;

pub use auth::{AuthToken, NewSession, Session, BCRYPT_POW_COST};
pub use blog::{Blog, BlogActivity, BlogId, NewBlog};
pub use comment::{Comment, CommentId, NewComment};
pub use error::Error;
pub use notification::{
    LikeToggle, NewNotification, Notification, NotificationFilter, NotificationId,
    NotificationKind, NotificationQuery,
};
pub use store::{AccountDelta, ActivityDelta, Store};
pub use user::{AccountInfo, NewUser, User, UserId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UploadUrl {
    pub url: String,
}

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}
