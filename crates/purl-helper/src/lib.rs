//! Package URL (purl) parsing and project URL synthesis.
//!
//! A purl has the shape `pkg:<type>/[<namespace>/]<name>[@<version>][?<qualifiers>][#<subpath>]`.
//! Namespace and name segments are percent-encoded on the wire
//! (`pkg:npm/%40angular/elements` carries the scoped name `@angular/elements`).

use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PurlError {
    #[error("invalid purl: {0}")]
    Invalid(String),
    #[error("unsupported purl type: {0}")]
    UnsupportedType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Purl {
    pub purl_type: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: Option<String>,
    pub subpath: Option<String>,
}

impl Purl {
    /// The bare purl name: `namespace/name` when a namespace is present
    /// (github repos, npm scoped packages), plain `name` otherwise.
    pub fn purl_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl FromStr for Purl {
    type Err = PurlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PurlError::Invalid("no purl string supplied".to_string()));
        }
        let rest = s
            .strip_prefix("pkg:")
            .ok_or_else(|| PurlError::Invalid(format!("missing pkg scheme: {s}")))?;
        if rest.is_empty() || rest.starts_with(':') {
            return Err(PurlError::Invalid(format!("missing purl type: {s}")));
        }

        let (rest, subpath) = match rest.split_once('#') {
            Some((head, sub)) if !sub.is_empty() => (head, Some(sub.to_string())),
            Some((head, _)) => (head, None),
            None => (rest, None),
        };
        let (rest, qualifiers) = match rest.split_once('?') {
            Some((head, quals)) if !quals.is_empty() => (head, Some(quals.to_string())),
            Some((head, _)) => (head, None),
            None => (rest, None),
        };
        // The raw separator is a literal '@'; an '@' inside a scoped name is
        // always percent-encoded at this point.
        let (rest, version) = match rest.rsplit_once('@') {
            Some((head, ver)) if !ver.is_empty() => (head, Some(ver.to_string())),
            Some((head, _)) => (head, None),
            None => (rest, None),
        };

        let segments: Vec<&str> = rest.trim_matches('/').split('/').collect();
        let purl_type = segments[0].to_lowercase();
        if purl_type.is_empty() || purl_type.contains(':') {
            return Err(PurlError::Invalid(format!("missing purl type: {s}")));
        }
        if segments.len() < 2 || segments[segments.len() - 1].is_empty() {
            return Err(PurlError::Invalid(format!("missing purl name: {s}")));
        }

        let name = decode_segment(segments[segments.len() - 1])?;
        let namespace = if segments.len() > 2 {
            let decoded: Result<Vec<String>, PurlError> = segments[1..segments.len() - 1]
                .iter()
                .map(|seg| decode_segment(seg))
                .collect();
            Some(decoded?.join("/"))
        } else {
            None
        };

        Ok(Purl {
            purl_type,
            namespace,
            name,
            version,
            qualifiers,
            subpath,
        })
    }
}

impl fmt::Display for Purl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}", self.purl_type)?;
        if let Some(ns) = &self.namespace {
            write!(f, "/{}", encode_segments(ns))?;
        }
        write!(f, "/{}", urlencoding::encode(&self.name))?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        if let Some(qualifiers) = &self.qualifiers {
            write!(f, "?{qualifiers}")?;
        }
        if let Some(subpath) = &self.subpath {
            write!(f, "#{subpath}")?;
        }
        Ok(())
    }
}

/// Parse a purl string into its parts.
pub fn purl_from_string(purl_string: &str) -> Result<Purl, PurlError> {
    purl_string.parse()
}

/// The bare purl name for a purl string, stripped of scheme, type,
/// version, qualifiers and subpath.
pub fn purl_name_from_string(purl_string: &str) -> Result<String, PurlError> {
    let purl: Purl = purl_string.parse()?;
    Ok(purl.purl_name())
}

/// Synthesize the browsable project URL for a purl name and type.
///
/// Unknown types are a soft failure; callers keep going with an empty URL.
pub fn project_url(purl_name: &str, purl_type: &str) -> Result<String, PurlError> {
    match purl_type {
        "github" => Ok(format!("https://github.com/{purl_name}")),
        "npm" => Ok(format!(
            "https://www.npmjs.com/package/{}",
            encode_segments(purl_name)
        )),
        "pypi" => Ok(format!("https://pypi.org/project/{purl_name}")),
        "gem" => Ok(format!("https://rubygems.org/gems/{purl_name}")),
        other => Err(PurlError::UnsupportedType(other.to_string())),
    }
}

fn decode_segment(segment: &str) -> Result<String, PurlError> {
    urlencoding::decode(segment)
        .map(|cow| cow.into_owned())
        .map_err(|e| PurlError::Invalid(format!("bad percent-encoding in {segment}: {e}")))
}

// Encode each path segment on its own so separators survive
// (`@angular/elements` becomes `%40angular/elements`).
fn encode_segments(name: &str) -> String {
    name.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_purl() {
        let purl = purl_from_string("pkg:github/scanoss/engine").unwrap();
        assert_eq!(purl.purl_type, "github");
        assert_eq!(purl.namespace.as_deref(), Some("scanoss"));
        assert_eq!(purl.name, "engine");
        assert_eq!(purl.purl_name(), "scanoss/engine");
    }

    #[test]
    fn test_parse_scoped_npm_purl() {
        let purl = purl_from_string("pkg:npm/%40angular/elements").unwrap();
        assert_eq!(purl.namespace.as_deref(), Some("@angular"));
        assert_eq!(purl.name, "elements");
        assert_eq!(purl.purl_name(), "@angular/elements");
    }

    #[test]
    fn test_parse_version_and_qualifiers() {
        let purl = purl_from_string("pkg:gem/tablestyle@0.6.5?platform=ruby").unwrap();
        assert_eq!(purl.purl_type, "gem");
        assert_eq!(purl.namespace, None);
        assert_eq!(purl.name, "tablestyle");
        assert_eq!(purl.version.as_deref(), Some("0.6.5"));
        assert_eq!(purl.qualifiers.as_deref(), Some("platform=ruby"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(purl_from_string("").is_err());
        assert!(purl_from_string("pkg:").is_err());
        assert!(purl_from_string("pkg::pypi").is_err());
        assert!(purl_from_string("pkg:npm").is_err());
        assert!(purl_from_string("pkg:npm/").is_err());
        assert!(purl_from_string("tablestyle").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for input in [
            "pkg:github/scanoss/engine",
            "pkg:npm/%40angular/elements@11.0.2",
            "pkg:pypi/requests",
            "pkg:gem/tablestyle@0.6.5",
        ] {
            let purl = purl_from_string(input).unwrap();
            assert_eq!(purl.to_string(), input);
        }
    }

    #[test]
    fn test_purl_name_from_string() {
        assert_eq!(
            purl_name_from_string("pkg:github/torvalds/linux@v6.1").unwrap(),
            "torvalds/linux"
        );
        assert_eq!(purl_name_from_string("pkg:pypi/requests").unwrap(), "requests");
        assert_eq!(
            purl_name_from_string("pkg:npm/%40angular/elements").unwrap(),
            "@angular/elements"
        );
    }

    #[test]
    fn test_project_url_per_type() {
        assert_eq!(
            project_url("scanoss/engine", "github").unwrap(),
            "https://github.com/scanoss/engine"
        );
        assert_eq!(
            project_url("@angular/elements", "npm").unwrap(),
            "https://www.npmjs.com/package/%40angular/elements"
        );
        assert_eq!(
            project_url("requests", "pypi").unwrap(),
            "https://pypi.org/project/requests"
        );
        assert_eq!(
            project_url("tablestyle", "gem").unwrap(),
            "https://rubygems.org/gems/tablestyle"
        );
    }

    #[test]
    fn test_project_url_unknown_type() {
        let err = project_url("something", "maven").unwrap_err();
        assert_eq!(err, PurlError::UnsupportedType("maven".to_string()));
    }
}
