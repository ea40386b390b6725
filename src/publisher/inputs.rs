use crate::error::ValidationError;
use crate::github::types::ReleaseSpec;
use std::path::PathBuf;

/// Validated arguments of a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishInputs {
    pub release: ReleaseSpec,
    pub bundle: PathBuf,
}

impl PublishInputs {
    pub fn validate(
        name: Option<String>,
        target: Option<String>,
        bundle: Option<PathBuf>,
        prerelease: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = required(name, "release name")?;
        let target = required(target, "target ref")?;
        let bundle = bundle
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ValidationError::MissingParameter("artifact bundle path"))?;
        let prerelease = match prerelease.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(flag) => parse_flag(flag)?,
        };

        if !bundle.is_file() {
            return Err(ValidationError::BundleNotFound(bundle));
        }

        Ok(Self {
            release: ReleaseSpec {
                name,
                target,
                prerelease,
            },
            bundle,
        })
    }
}

fn required(value: Option<String>, label: &'static str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingParameter(label))
}

pub fn parse_flag(flag: &str) -> Result<bool, ValidationError> {
    match flag.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ValidationError::InvalidPrerelease(flag.to_string())),
    }
}

/// First non-empty token among the candidates, in order.
pub fn resolve_token<I>(candidates: I) -> Result<String, ValidationError>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
        .ok_or(ValidationError::MissingToken)
}
