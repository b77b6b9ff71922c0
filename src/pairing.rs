use crate::error::TilerError;
use std::str::FromStr;

/// Derives the mask filename paired with an image filename.
pub trait MaskPairing {
    fn mask_name(&self, image_name: &str) -> Option<String>;
}

impl<F> MaskPairing for F
where
    F: Fn(&str) -> Option<String>,
{
    fn mask_name(&self, image_name: &str) -> Option<String> {
        self(image_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PairingRule {
    /// Mask shares the image's filename.
    #[default]
    Same,
    /// Drop the last N characters (`scene.tiff` → `scene.tif` for N = 1).
    TrimChars(usize),
    /// Replace a trailing suffix (`scene_sat.jpg` → `scene_mask.png`).
    Suffix { from: String, to: String },
}

impl MaskPairing for PairingRule {
    fn mask_name(&self, image_name: &str) -> Option<String> {
        match self {
            PairingRule::Same => Some(image_name.to_string()),
            PairingRule::TrimChars(n) => {
                let keep = image_name.chars().count().checked_sub(*n)?;
                if keep == 0 {
                    return None;
                }
                Some(image_name.chars().take(keep).collect())
            }
            PairingRule::Suffix { from, to } => image_name
                .strip_suffix(from.as_str())
                .map(|stem| format!("{}{}", stem, to)),
        }
    }
}

impl FromStr for PairingRule {
    type Err = TilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TilerError::InvalidPairingRule(s.to_string());
        let mut parts = s.splitn(3, ':');

        match parts.next().map(str::trim) {
            Some("same") if parts.next().is_none() => Ok(PairingRule::Same),
            Some("trim") => {
                let n: usize = parts
                    .next()
                    .and_then(|n| n.trim().parse().ok())
                    .ok_or_else(invalid)?;
                if parts.next().is_some() {
                    return Err(invalid());
                }
                Ok(PairingRule::TrimChars(n))
            }
            Some("suffix") => {
                let from = parts.next().filter(|f| !f.is_empty()).ok_or_else(invalid)?;
                let to = parts.next().ok_or_else(invalid)?;
                Ok(PairingRule::Suffix {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}
