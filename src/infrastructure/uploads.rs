use chrono::Utc;
use sha1::{Digest, Sha1};

use crate::domain::ports::UploadSigner;
use crate::domain::upload::SignedUpload;

/// Signs direct browser uploads to Cloudinary.
pub struct CloudinarySigner {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinarySigner {
    pub fn new(cloud_name: &str, api_key: &str, api_secret: &str) -> Self {
        Self {
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    fn sign_at(&self, timestamp: i64) -> SignedUpload {
        let mut hasher = Sha1::new();
        hasher.update(format!("timestamp={timestamp}{}", self.api_secret).as_bytes());
        SignedUpload {
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                self.cloud_name
            ),
            api_key: self.api_key.clone(),
            timestamp,
            signature: hex::encode(hasher.finalize()),
        }
    }
}

impl UploadSigner for CloudinarySigner {
    fn sign_upload(&self) -> SignedUpload {
        self.sign_at(Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_covers_timestamp_and_secret() {
        let signer = CloudinarySigner::new("demo", "1234", "cloud-secret");

        let signed = signer.sign_at(1_700_000_000);

        assert_eq!(
            signed.upload_url,
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
        assert_eq!(signed.api_key, "1234");
        assert_eq!(signed.timestamp, 1_700_000_000);
        assert_eq!(signed.signature, "27454d52c385640db3915c5abc19f541a5bfbc18");
    }
}
