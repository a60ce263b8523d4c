use std::{str::FromStr, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};

use crate::{configuration::Config, error::Error, types::PushHeader};

#[derive(Debug)]
pub struct HTTP {
    pub config: Config,
    pub http: Client,
}

impl HTTP {
    pub fn new(config: Config) -> Result<HTTP, Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(HTTP { config, http })
    }

    /// Posts an aes128gcm-encrypted message to a push service endpoint and
    /// returns the gateway status code.
    pub async fn post_push(
        &self,
        url: String,
        signature: String,
        push_header: PushHeader,
        data: Vec<u8>,
    ) -> Result<u16, Error> {
        let mut header_map = HeaderMap::new();
        let bearer = format!("WebPush {}", &signature);

        header_map.insert(
            HeaderName::from_str("User-Agent")?,
            HeaderValue::from_str("gorkhon-api")?,
        );
        header_map.insert(
            HeaderName::from_str("authorization")?,
            HeaderValue::from_str(bearer.as_str())?,
        );
        header_map.insert(
            HeaderName::from_str("content-encoding")?,
            HeaderValue::from_str("aes128gcm")?,
        );
        header_map.insert(
            HeaderName::from_str("ttl")?,
            HeaderValue::from_str(&push_header.ttl.to_string())?,
        );
        header_map.insert(
            HeaderName::from_str("urgency")?,
            HeaderValue::from_str(&push_header.urgency.to_string())?,
        );

        let vapid_public = String::from_utf8(self.config.vapid_public_key.clone())
            .map_err(|_| Error::InvalidHeader(String::from("invalid VAPID public key")))?;
        header_map.insert(
            HeaderName::from_str("crypto-key")?,
            HeaderValue::from_str(&format!("p256ecdsa={}", vapid_public.trim()))?,
        );

        let response = self
            .http
            .post(url)
            .headers(header_map)
            .body(data)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}
