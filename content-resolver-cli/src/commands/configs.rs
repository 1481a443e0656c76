//! Configs command: load, resolve, print

use super::OutputFormat;
use convenient_content::{ConfigManager, Configs, EntityKind, Settings};
use std::path::{Path, PathBuf};

/// Options of the configs command
pub struct ConfigsOptions {
    pub configs: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub labels: Option<String>,
    pub arches: Vec<String>,
    pub strict: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Merge the settings file (if any) with command-line overrides
pub fn build_settings(options: &ConfigsOptions) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &options.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(configs) = &options.configs {
        settings.configs.clone_from(configs);
    }
    if let Some(labels) = &options.labels {
        settings = settings.with_labels(labels.clone());
    }
    if !options.arches.is_empty() {
        settings = settings.with_allowed_arches(options.arches.iter().cloned());
    }
    if options.strict {
        settings = settings.with_strict(true);
    }
    settings.validate()?;
    Ok(settings)
}

/// Execute the configs command
pub fn execute(options: &ConfigsOptions) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(options)?;
    let selection = settings.label_selection();

    tracing::info!("Loading configs from {}", settings.configs.display());
    let manager = ConfigManager::new(settings)?;
    let configs = manager.get_configs()?;

    let rendered = match options.format {
        OutputFormat::Json => serde_json::to_string_pretty(&configs)?,
        OutputFormat::Text => render_text(&manager, &configs, &selection.to_string()),
    };

    match &options.output {
        Some(path) => write_output(path, &rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn write_output(path: &Path, rendered: &str) -> std::io::Result<()> {
    std::fs::write(path, rendered)?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

fn render_text(manager: &ConfigManager, configs: &Configs, labels: &str) -> String {
    let report = manager.load_report();
    let mut lines = vec![
        format!("📋 Configs for labels: {labels}"),
        format!("  Snapshot: {}", manager.store().fingerprint()),
        format!("  Documents loaded: {}", report.documents),
    ];
    if report.has_errors() {
        lines.push(format!("  ⚠️  {} documents excluded:", report.errors.len()));
        lines.extend(report.errors.iter().map(|error| format!("     - {error}")));
    }
    lines.push(String::new());

    for kind in EntityKind::ALL {
        let ids = configs.ids(kind);
        lines.push(format!("  {:<24} {:>4}", kind.key(), ids.len()));
        lines.extend(ids.iter().map(|id| format!("    - {id}")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options() -> ConfigsOptions {
        ConfigsOptions {
            configs: None,
            settings: None,
            labels: None,
            arches: Vec::new(),
            strict: false,
            format: OutputFormat::Text,
            output: None,
        }
    }

    #[test]
    fn test_cli_overrides_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "configs: from_file\nselected_labels: fedora\nallowed_arches: [s390x]").unwrap();

        let mut options = options();
        options.settings = Some(file.path().to_path_buf());
        options.labels = Some("eln".to_string());
        options.arches = vec!["x86_64".to_string()];

        let settings = build_settings(&options).unwrap();
        assert_eq!(settings.configs, PathBuf::from("from_file"));
        assert_eq!(settings.label_selection().to_string(), "eln");
        assert!(settings.is_allowed_arch("x86_64"));
        assert!(!settings.is_allowed_arch("s390x"));
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let mut options = options();
        options.configs = Some(PathBuf::from("test_configs"));
        options.strict = true;

        let settings = build_settings(&options).unwrap();
        assert_eq!(settings.configs, PathBuf::from("test_configs"));
        assert!(settings.strict);
        assert_eq!(settings.allowed_arches.len(), 4);
    }
}
