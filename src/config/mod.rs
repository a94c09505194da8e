//! Configuration parsing and validation.
//!
//! The warehouse configuration is an INI-style file with three sections:
//!
//! ```ini
//! [IAM_ROLE]
//! ARN = arn:aws:iam::123456789012:role/dwh-load
//!
//! [S3]
//! LOG_DATA = s3://data-lake/log_data
//! SONG_DATA = s3://data-lake/song_data
//! REGION = us-west-2
//!
//! [CLUSTER]
//! HOST = cluster.example.com
//! DB_NAME = dwh
//! DB_USER = dwh_admin
//! DB_PASSWORD = ${DWH_PASSWORD}
//! DB_PORT = 5439
//! ```
//!
//! Values may reference environment variables (`${VAR}`, `${VAR:-default}`),
//! resolved before the file is parsed. The IAM role ARN is validated here,
//! at load time, because it is interpolated into the bulk-load statement
//! text exactly once and never again inspected.

mod vars;

use ini::Ini;
use regex::Regex;
use snafu::prelude::*;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{
    ConfigError, EnvInterpolationSnafu, IniParseSnafu, InvalidArnSnafu, InvalidPortSnafu,
    MissingKeySnafu, MissingSectionSnafu, ReadFileSnafu,
};

/// Default warehouse port (Redshift).
const DEFAULT_DB_PORT: u16 = 5439;

/// Default object-storage region for bulk loads.
const DEFAULT_REGION: &str = "us-west-2";

static ARN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws:iam::\d{12}:role/[A-Za-z0-9+=,.@_/-]+$").expect("Invalid regex pattern")
});

/// Main configuration structure for the loader.
#[derive(Debug, Clone)]
pub struct Config {
    pub iam_role: IamRoleConfig,
    pub s3: S3Config,
    pub cluster: ClusterConfig,
}

/// Authorization identity for the bulk-load statements.
#[derive(Debug, Clone)]
pub struct IamRoleConfig {
    /// IAM role ARN, validated against the `arn:aws:iam::<account>:role/<name>` shape.
    pub arn: String,
}

/// Object-storage locations of the staged JSON sources.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Location of the activity-log events (newline-delimited JSON).
    pub log_data: String,
    /// Location of the song-catalog entries (newline-delimited JSON).
    pub song_data: String,
    /// Region the source buckets live in (default: us-west-2).
    pub region: String,
}

/// Connection parameters for the warehouse cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    /// Port (default: 5439).
    pub db_port: u16,
}

impl Config {
    /// Load configuration from an INI file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;
        Self::from_ini_str(&content)
    }

    /// Parse configuration from INI text, applying environment variable
    /// interpolation first.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let interpolated = vars::interpolate(content);
        ensure!(
            interpolated.is_ok(),
            EnvInterpolationSnafu {
                missing: interpolated.missing.join(", "),
            }
        );

        let ini = Ini::load_from_str(&interpolated.text).context(IniParseSnafu)?;

        let arn = required(&ini, "IAM_ROLE", "ARN")?;
        ensure!(ARN_PATTERN.is_match(arn), InvalidArnSnafu { arn });

        let db_port = match optional(&ini, "CLUSTER", "DB_PORT") {
            Some(raw) => raw.parse().context(InvalidPortSnafu { value: raw })?,
            None => DEFAULT_DB_PORT,
        };

        Ok(Config {
            iam_role: IamRoleConfig {
                arn: arn.to_string(),
            },
            s3: S3Config {
                log_data: required(&ini, "S3", "LOG_DATA")?.to_string(),
                song_data: required(&ini, "S3", "SONG_DATA")?.to_string(),
                region: optional(&ini, "S3", "REGION")
                    .unwrap_or(DEFAULT_REGION)
                    .to_string(),
            },
            cluster: ClusterConfig {
                host: required(&ini, "CLUSTER", "HOST")?.to_string(),
                db_name: required(&ini, "CLUSTER", "DB_NAME")?.to_string(),
                db_user: required(&ini, "CLUSTER", "DB_USER")?.to_string(),
                db_password: required(&ini, "CLUSTER", "DB_PASSWORD")?.to_string(),
                db_port,
            },
        })
    }

    /// Render a key-value connection string for the SQL client.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            quote(&self.cluster.host),
            self.cluster.db_port,
            quote(&self.cluster.db_name),
            quote(&self.cluster.db_user),
            quote(&self.cluster.db_password),
        )
    }
}

fn required<'a>(ini: &'a Ini, section: &'static str, key: &'static str) -> Result<&'a str, ConfigError> {
    let props = ini
        .section(Some(section))
        .context(MissingSectionSnafu { section })?;
    props.get(key).context(MissingKeySnafu { section, key })
}

fn optional<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section)).and_then(|props| props.get(key))
}

/// Quote a connection-string value if it contains characters the key-value
/// format treats specially.
fn quote(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
[IAM_ROLE]
ARN = arn:aws:iam::123456789012:role/dwh-load

[S3]
LOG_DATA = s3://data-lake/log_data
SONG_DATA = s3://data-lake/song_data

[CLUSTER]
HOST = cluster.example.com
DB_NAME = dwh
DB_USER = dwh_admin
DB_PASSWORD = secret
";

    #[test]
    fn test_parse_valid_config() {
        let config = Config::from_ini_str(VALID).unwrap();
        assert_eq!(config.iam_role.arn, "arn:aws:iam::123456789012:role/dwh-load");
        assert_eq!(config.s3.log_data, "s3://data-lake/log_data");
        assert_eq!(config.s3.song_data, "s3://data-lake/song_data");
        assert_eq!(config.cluster.host, "cluster.example.com");
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_ini_str(VALID).unwrap();
        assert_eq!(config.s3.region, "us-west-2");
        assert_eq!(config.cluster.db_port, 5439);
    }

    #[test]
    fn test_missing_arn_is_an_error() {
        let content = VALID.replace("ARN = arn:aws:iam::123456789012:role/dwh-load", "");
        let err = Config::from_ini_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let content = VALID.replace("[S3]", "[OBJECT_STORE]");
        let err = Config::from_ini_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection { .. }));
    }

    #[test]
    fn test_malformed_arn_rejected() {
        for bad in [
            "not-an-arn",
            "arn:aws:iam::12:role/short-account",
            "arn:aws:iam::123456789012:role/evil' region 'us-east-1",
        ] {
            let content = VALID.replace("arn:aws:iam::123456789012:role/dwh-load", bad);
            let err = Config::from_ini_str(&content).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidArn { .. }), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let content = format!("{VALID}DB_PORT = not-a-port\n");
        let err = Config::from_ini_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn test_connection_string() {
        let mut config = Config::from_ini_str(VALID).unwrap();
        config.cluster.db_password = "p4ss w'd".to_string();
        assert_eq!(
            config.connection_string(),
            r"host=cluster.example.com port=5439 dbname=dwh user=dwh_admin password='p4ss w\'d'"
        );
    }

    #[test]
    fn test_from_file_reads_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dwh.cfg");
        std::fs::write(&path, VALID).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.cluster.db_name, "dwh");

        let err = Config::from_file(dir.path().join("absent.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
