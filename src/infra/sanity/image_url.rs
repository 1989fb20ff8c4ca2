//! Image CDN URLs for image assets stored in the dataset.

use crate::error::ImageUrlError;
use crate::infra::config::ClientConfig;
use serde_json::Value as JsonValue;

pub const IMAGE_CDN: &str = "https://cdn.sanity.io/images";

/// A parsed `image-<id>-<width>x<height>-<format>` asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl ImageAsset {
    pub fn parse(reference: &str) -> Result<Self, ImageUrlError> {
        let malformed = || ImageUrlError::MalformedRef(reference.to_string());

        let rest = reference.strip_prefix("image-").ok_or_else(malformed)?;
        let mut parts = rest.rsplitn(3, '-');
        let format = parts.next().ok_or_else(malformed)?;
        let dimensions = parts.next().ok_or_else(malformed)?;
        let id = parts.next().ok_or_else(malformed)?;

        let (width, height) = dimensions.split_once('x').ok_or_else(malformed)?;
        let width = width.parse().map_err(|_| malformed())?;
        let height = height.parse().map_err(|_| malformed())?;
        if id.is_empty() || format.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            id: id.to_string(),
            width,
            height,
            format: format.to_string(),
        })
    }

    /// Accepts a bare reference string, an asset document (`{_id}`), a
    /// reference (`{_ref}`) or an image field (`{asset: {...}}`).
    pub fn from_source(source: &JsonValue) -> Result<Self, ImageUrlError> {
        if let Some(reference) = source.as_str() {
            return Self::parse(reference);
        }
        let target = source.get("asset").unwrap_or(source);
        let reference = target
            .get("_ref")
            .or_else(|| target.get("_id"))
            .and_then(JsonValue::as_str)
            .ok_or(ImageUrlError::MissingAsset)?;
        Self::parse(reference)
    }

    fn file_name(&self) -> String {
        format!("{}-{}x{}.{}", self.id, self.width, self.height, self.format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Clip,
    Crop,
    Fill,
    FillMax,
    Max,
    Scale,
    Min,
}

impl Fit {
    fn as_str(self) -> &'static str {
        match self {
            Fit::Clip => "clip",
            Fit::Crop => "crop",
            Fit::Fill => "fill",
            Fit::FillMax => "fillmax",
            Fit::Max => "max",
            Fit::Scale => "scale",
            Fit::Min => "min",
        }
    }
}

/// Builds transformed image URLs for one project/dataset.
///
/// Each setter returns a new builder, so a configured base can be reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
    quality: Option<u8>,
    fit: Option<Fit>,
    auto_format: bool,
}

impl ImageUrlBuilder {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            project_id: config.project_id().to_string(),
            dataset: config.dataset().to_string(),
            ..Default::default()
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Output format, e.g. `webp`.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Clamped to 0..=100.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.min(100));
        self
    }

    pub fn fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    pub fn auto_format(mut self) -> Self {
        self.auto_format = true;
        self
    }

    pub fn url(&self, source: &JsonValue) -> Result<String, ImageUrlError> {
        let asset = ImageAsset::from_source(source)?;
        Ok(self.url_for(&asset))
    }

    pub fn url_for(&self, asset: &ImageAsset) -> String {
        let mut url = format!(
            "{}/{}/{}/{}",
            IMAGE_CDN,
            self.project_id,
            self.dataset,
            asset.file_name()
        );

        let mut params: Vec<String> = Vec::new();
        if let Some(w) = self.width {
            params.push(format!("w={w}"));
        }
        if let Some(h) = self.height {
            params.push(format!("h={h}"));
        }
        if let Some(fm) = &self.format {
            params.push(format!("fm={fm}"));
        }
        if let Some(q) = self.quality {
            params.push(format!("q={q}"));
        }
        if let Some(fit) = self.fit {
            params.push(format!("fit={}", fit.as_str()));
        }
        if self.auto_format {
            params.push("auto=format".to_string());
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}
