// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed access to the string parameter map sent with a request.

use std::collections::HashMap;
use std::str::FromStr;

use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_core::{ImageOutputFormat, PageSelection, Rotation, Secret, TableFormat, WatermarkStyle};

pub const DEFAULT_WATERMARK_TEXT: &str = "Watermark";
pub const DEFAULT_ROTATION: i64 = 90;

/// Every key an operation may read. Anything else is ignored.
pub const KNOWN_KEYS: &[&str] = &[
    "pages",
    "degrees",
    "dpi",
    "text",
    "angle",
    "opacity",
    "font_size",
    "password",
    "owner_password",
    "quality",
    "format",
];

#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    map: &'a HashMap<String, String>,
}

impl<'a> Params<'a> {
    pub fn new(map: &'a HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Keys the dispatcher does not understand, sorted.
    pub fn unknown_keys(&self) -> Vec<&'a str> {
        let mut keys: Vec<&str> = self
            .map
            .keys()
            .map(String::as_str)
            .filter(|k| !KNOWN_KEYS.contains(k))
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Trimmed value, `None` when absent or blank.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.map
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| {
                    FalzwerkError::InvalidParameter(format!("{key} has an invalid value: {raw:?}"))
                })
            })
            .transpose()
    }

    pub fn pages(&self) -> Result<PageSelection> {
        self.get("pages")
            .map_or(Ok(PageSelection::All), PageSelection::parse)
    }

    pub fn rotation(&self) -> Result<Rotation> {
        Rotation::normalize(self.parse::<i64>("degrees")?.unwrap_or(DEFAULT_ROTATION))
    }

    pub fn dpi(&self, default: u32) -> Result<u32> {
        Ok(self.parse::<u32>("dpi")?.unwrap_or(default))
    }

    /// Watermark text as given; only surrounding whitespace is dropped.
    pub fn text(&self) -> String {
        self.get("text").unwrap_or(DEFAULT_WATERMARK_TEXT).to_owned()
    }

    pub fn watermark_style(&self) -> Result<WatermarkStyle> {
        let defaults = WatermarkStyle::default();
        let style = WatermarkStyle {
            angle_degrees: self.parse("angle")?.unwrap_or(defaults.angle_degrees),
            opacity: self.parse("opacity")?.unwrap_or(defaults.opacity),
            font_size: self.parse("font_size")?.unwrap_or(defaults.font_size),
            gray: defaults.gray,
        };
        style.validate()?;
        Ok(style)
    }

    /// A password parameter. Unlike other values it is not trimmed, and an
    /// empty string is passed on as given.
    pub fn secret(&self, key: &str) -> Option<Secret> {
        self.map.get(key).map(Secret::new)
    }

    pub fn required_secret(&self, key: &str) -> Result<Secret> {
        match self.secret(key) {
            Some(secret) if !secret.expose().is_empty() => Ok(secret),
            _ => Err(FalzwerkError::InvalidParameter(format!("{key} is required"))),
        }
    }

    /// JPEG quality in 1..=100.
    pub fn quality(&self, default: u8) -> Result<u8> {
        let quality = self.parse::<u8>("quality")?.unwrap_or(default);
        if !(1..=100).contains(&quality) {
            return Err(FalzwerkError::InvalidParameter(format!(
                "quality must be between 1 and 100, got {quality}"
            )));
        }
        Ok(quality)
    }

    pub fn image_format(&self) -> Result<ImageOutputFormat> {
        Ok(self.parse::<ImageOutputFormat>("format")?.unwrap_or_default())
    }

    pub fn table_format(&self) -> Result<TableFormat> {
        Ok(self.parse::<TableFormat>("format")?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use falzwerk_core::ErrorKind;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply_when_absent() {
        let empty = map(&[]);
        let params = Params::new(&empty);
        assert_eq!(params.pages().unwrap(), PageSelection::All);
        assert_eq!(params.rotation().unwrap().degrees(), 90);
        assert_eq!(params.dpi(150).unwrap(), 150);
        assert_eq!(params.text(), "Watermark");
        assert_eq!(params.watermark_style().unwrap(), WatermarkStyle::default());
        assert_eq!(params.quality(60).unwrap(), 60);
        assert_eq!(params.image_format().unwrap(), ImageOutputFormat::Jpeg);
        assert_eq!(params.table_format().unwrap(), TableFormat::Xlsx);
        assert!(params.secret("password").is_none());
    }

    #[test]
    fn values_are_parsed() {
        let values = map(&[
            ("pages", "2-3"),
            ("degrees", "-90"),
            ("dpi", " 300 "),
            ("opacity", "0.5"),
            ("format", "png"),
        ]);
        let params = Params::new(&values);
        assert_eq!(params.pages().unwrap(), PageSelection::indices([1, 2]));
        assert_eq!(params.rotation().unwrap().degrees(), 270);
        assert_eq!(params.dpi(150).unwrap(), 300);
        assert_eq!(params.watermark_style().unwrap().opacity, 0.5);
        assert_eq!(params.image_format().unwrap(), ImageOutputFormat::Png);
    }

    #[test]
    fn bad_values_are_invalid_parameters() {
        for (key, value) in [("degrees", "45"), ("degrees", "ninety"), ("dpi", "-1"), ("quality", "0"), ("opacity", "2")] {
            let values = map(&[(key, value)]);
            let params = Params::new(&values);
            let err = match key {
                "degrees" => params.rotation().unwrap_err(),
                "dpi" => params.dpi(150).unwrap_err(),
                "quality" => params.quality(60).unwrap_err(),
                _ => params.watermark_style().unwrap_err(),
            };
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{key}={value}");
        }
    }

    #[test]
    fn passwords_are_not_trimmed() {
        let values = map(&[("password", " pw "), ("owner_password", "")]);
        let params = Params::new(&values);
        assert_eq!(params.secret("password").unwrap().expose(), " pw ");
        assert!(params.required_secret("owner_password").is_err());
        assert!(params.required_secret("missing").is_err());
    }

    #[test]
    fn unknown_keys_are_reported() {
        let values = map(&[("pages", "1"), ("colour", "red"), ("zoom", "2")]);
        assert_eq!(Params::new(&values).unknown_keys(), vec!["colour", "zoom"]);
    }
}
