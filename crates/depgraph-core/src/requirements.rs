//! Reading of `name==version` pin lists.

use std::path::Path;

use tracing::warn;

use crate::error::{DepGraphError, DepGraphResult};
use crate::package::{PackageName, Pin};

/// Parsed requirements file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Well-formed pins, in file order
    pub pins: Vec<Pin>,
    /// Lines that could not be read as a pin, as written
    pub invalid: Vec<String>,
}

impl Requirements {
    /// Parse requirements text; malformed lines are recorded, never fatal
    pub fn parse(contents: &str) -> Self {
        let mut requirements = Self::default();
        for raw in contents.lines() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            match parse_pin(line) {
                Some(pin) => requirements.pins.push(pin),
                None => {
                    warn!("Invalid format in line: {}", line);
                    requirements.invalid.push(line.to_string());
                }
            }
        }
        requirements
    }

    /// Load and parse a requirements file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> DepGraphResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DepGraphError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Self::parse(&contents))
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_pin(line: &str) -> Option<Pin> {
    let requirement = line.split(';').next()?.trim();
    let (name, version) = requirement.split_once("==")?;
    let name = match name.find('[') {
        Some(idx) => &name[..idx],
        None => name,
    };
    let version = version.trim();
    if version.is_empty() || version.contains(['=', '<', '>', '!', '~', ',', '*', ' ']) {
        return None;
    }
    let name = PackageName::new(name).ok()?;
    Some(Pin::new(name, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_pins_and_invalid_lines() {
        let contents = "\
# pinned for production
requests==2.31.0
Flask==3.0.0  # web
numpy
urllib3>=1.26

django[argon2]==4.2.7 ; python_version >= \"3.8\"
-r dev.txt
";
        let reqs = Requirements::parse(contents);
        let pins: Vec<String> = reqs.pins.iter().map(|p| p.to_string()).collect();
        assert_eq!(pins, vec!["requests==2.31.0", "flask==3.0.0", "django==4.2.7"]);
        assert_eq!(reqs.invalid, vec!["numpy", "urllib3>=1.26", "-r dev.txt"]);
    }

    #[test]
    fn test_missing_version_is_invalid() {
        let reqs = Requirements::parse("pandas==\n==1.0\n");
        assert!(reqs.is_empty());
        assert_eq!(reqs.invalid.len(), 2);
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "six==1.16.0").unwrap();
        let reqs = Requirements::from_file(file.path()).await.unwrap();
        assert_eq!(reqs.pins.len(), 1);
        assert_eq!(reqs.pins[0].version(), "1.16.0");

        let missing = Requirements::from_file(file.path().with_extension("missing")).await;
        assert!(matches!(missing, Err(DepGraphError::Io(_))));
    }
}
