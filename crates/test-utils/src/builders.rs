#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use encarun::config::model::default_accounts;
use encarun::config::{ConfigFile, ControllerSection, NumericParameter, RawConfigFile, RunSection};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from a config that passes structural validation: executable
/// `enca-test`, account `carbon`, run `baseline` in `/data/out`, year 2020.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                controller: ControllerSection {
                    executable: "enca-test".to_string(),
                    base_args: Vec::new(),
                    accounts: default_accounts(),
                    verbose: true,
                    env: BTreeMap::new(),
                    log_file_name: None,
                },
                run: RunSection {
                    account: "carbon".to_string(),
                    run_name: "baseline".to_string(),
                    output_dir: PathBuf::from("/data/out"),
                    years: vec![2020],
                    tier: None,
                    aoi_name: None,
                    continue_run: false,
                    inputs: BTreeMap::new(),
                    parameters: BTreeMap::new(),
                },
            },
        }
    }

    pub fn executable(mut self, exe: &str) -> Self {
        self.config.controller.executable = exe.to_string();
        self
    }

    pub fn base_args(mut self, args: &[&str]) -> Self {
        self.config.controller.base_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn verbose(mut self, val: bool) -> Self {
        self.config.controller.verbose = val;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config
            .controller
            .env
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn log_file_name(mut self, name: &str) -> Self {
        self.config.controller.log_file_name = Some(name.to_string());
        self
    }

    pub fn account(mut self, account: &str) -> Self {
        self.config.run.account = account.to_string();
        self
    }

    pub fn run_name(mut self, name: &str) -> Self {
        self.config.run.run_name = name.to_string();
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.run.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn years(mut self, years: &[i32]) -> Self {
        self.config.run.years = years.to_vec();
        self
    }

    pub fn tier(mut self, tier: u8) -> Self {
        self.config.run.tier = Some(tier);
        self
    }

    pub fn aoi_name(mut self, name: &str) -> Self {
        self.config.run.aoi_name = Some(name.to_string());
        self
    }

    pub fn continue_run(mut self, val: bool) -> Self {
        self.config.run.continue_run = val;
        self
    }

    pub fn input(mut self, name: &str, path: impl AsRef<Path>) -> Self {
        self.config
            .run
            .inputs
            .insert(name.to_string(), path.as_ref().to_path_buf());
        self
    }

    pub fn parameter(mut self, name: &str, param: NumericParameter) -> Self {
        self.config.run.parameters.insert(name.to_string(), param);
        self
    }

    /// The raw form, for tests of structural validation itself.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
