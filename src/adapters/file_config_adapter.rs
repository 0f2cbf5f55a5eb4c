//! INI file configuration adapter.
//!
//! Keys and section names are case-sensitive so instrument symbols in
//! `[instruments]` keep their exchange spelling.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new_cs();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new_cs();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        self.config.sections()
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(section)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[engine]
initial_capital = 250000
fill_timing = next_open

[signal]
lookback_period = 20
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("engine", "fill_timing"),
            Some("next_open".to_string())
        );
        assert_eq!(adapter.get_int("signal", "lookback_period", 0), 20);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter =
            FileConfigAdapter::from_string("[engine]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[session]\nwarmup_minutes = abc\n").unwrap();
        assert_eq!(adapter.get_int("session", "warmup_minutes", 15), 15);
        assert_eq!(adapter.get_int("session", "cooldown_minutes", 30), 30);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[engine]\nslippage_pct = 0.0005\nbad = x\n")
                .unwrap();
        assert_eq!(adapter.get_double("engine", "slippage_pct", 0.0), 0.0005);
        assert_eq!(adapter.get_double("engine", "bad", 9.9), 9.9);
        assert_eq!(adapter.get_double("engine", "missing", 1.5), 1.5);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[exits]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("exits", "a", false));
        assert!(adapter.get_bool("exits", "b", false));
        assert!(adapter.get_bool("exits", "c", false));
        assert!(!adapter.get_bool("exits", "d", true));
        assert!(!adapter.get_bool("exits", "e", true));
        assert!(!adapter.get_bool("exits", "f", true));
        assert!(adapter.get_bool("exits", "missing", true));
    }

    #[test]
    fn instrument_keys_keep_case() {
        let content = r#"
[sector.banking]
volume_mult = 0.8

[instruments]
HDFCBANK = banking
IciciBank = banking
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.keys("instruments"), vec!["HDFCBANK", "IciciBank"]);
        assert_eq!(
            adapter.get_string("instruments", "IciciBank"),
            Some("banking".to_string())
        );
        assert!(adapter.sections().contains(&"sector.banking".to_string()));
        assert!(adapter.keys("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[session]\nopen = 09:15\nclose = 15:30\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("session", "open"), Some("09:15".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
