//! Share links for finished runs
//!
//! A link carries the seed, score, rank and device as single-letter query
//! parameters: `/play?s=<seed>&sc=<score>&r=<rank>&d=<device>`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::platform::Device;
use crate::rules::Rank;
use crate::seed::{self, Seed};
use crate::{Error, Result};

pub const DEFAULT_ORIGIN: &str = "https://tilt-rift.vercel.app";

const QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareData {
    pub seed: Seed,
    pub score: u64,
    pub rank: Rank,
    pub device: Device,
}

/// What a received link carried; only the seed is required
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedRun {
    pub seed: Option<Seed>,
    pub score: Option<u64>,
    pub rank: Option<Rank>,
    pub device: Option<Device>,
}

impl ShareData {
    /// Link under `origin` (e.g. `window.location.origin`)
    pub fn url_with_origin(&self, origin: &str) -> Result<Url> {
        let mut url = Url::parse(origin)?.join("/play")?;
        url.query_pairs_mut()
            .append_pair("s", &seed::encode_seed(&self.seed))
            .append_pair("sc", &self.score.to_string())
            .append_pair("r", &self.rank.code().to_string())
            .append_pair("d", &self.device.code().to_string());
        Ok(url)
    }

    pub fn url(&self) -> Result<Url> {
        self.url_with_origin(DEFAULT_ORIGIN)
    }

    /// Message posted alongside the link
    pub fn text(&self) -> Result<String> {
        Ok(format!(
            "I scored {} on TILT//RIFT! Can you beat my score? {}",
            group_thousands(self.score),
            self.url()?
        ))
    }

    /// Image URL of a QR code pointing at the share link
    pub fn qr_code_url(&self) -> Result<String> {
        let link = self.url()?;
        let mut qr = Url::parse(QR_ENDPOINT)?;
        qr.query_pairs_mut()
            .append_pair("size", "200x200")
            .append_pair("data", link.as_str());
        Ok(qr.into())
    }
}

/// Read a share link
///
/// Fails on an unparseable URL or a link without a seed. Unknown rank or
/// device codes and unparseable scores are dropped instead of failing.
pub fn parse_share_url(link: &str) -> Result<SharedRun> {
    let url = Url::parse(link)?;
    let mut run = SharedRun::default();
    let mut encoded_seed = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "s" => encoded_seed = Some(value.into_owned()),
            "sc" => run.score = value.parse().ok(),
            "r" => run.rank = Rank::from_code(&value),
            "d" => run.device = Device::from_code(&value),
            _ => {}
        }
    }

    let encoded = encoded_seed.filter(|s| !s.is_empty()).ok_or(Error::MissingSeed)?;
    run.seed = Some(seed::decode_seed(&encoded)?);
    Ok(run)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
