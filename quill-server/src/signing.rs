use quill_api::{UploadUrl, UserId, Uuid};

/// Hands out signed upload URLs for user media.
///
/// The production deployment fronts an object storage bucket; everything
/// else only needs a URL that is unique per upload and scoped to the
/// requesting user.
pub trait UploadUrlSigner: Send + Sync {
    fn upload_url(&self, user: UserId, filename: &str) -> UploadUrl;
}

pub struct LocalSigner {
    base: String,
}

impl LocalSigner {
    pub fn new(base: impl Into<String>) -> LocalSigner {
        LocalSigner { base: base.into() }
    }
}

impl UploadUrlSigner for LocalSigner {
    fn upload_url(&self, user: UserId, filename: &str) -> UploadUrl {
        let safe: String = filename
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        UploadUrl {
            url: format!("{}/{}/{}-{}", self.base, user.0, Uuid::new_v4(), safe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        let signer = LocalSigner::new("https://uploads.test");
        let user = UserId::stub();
        let url = signer.upload_url(user, "../../etc/passwd à.png").url;
        assert!(url.starts_with(&format!("https://uploads.test/{}/", user.0)));
        assert!(url.ends_with("-.._.._etc_passwd__.png"));
    }
}
