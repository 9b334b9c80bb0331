use app_core::string_error::ErrorStringExt;
use std::{io::Read, path::PathBuf, str::FromStr};

/// Settings read from the `.spinview` dotfile in the home directory.
#[derive(Debug)]
pub struct Config {
    /// Directory the load dialogs start in.
    pub data_path: PathBuf,
    /// Default directory measurement runs are saved to.
    pub save_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_path = PathBuf::from("/tmp/");
        let save_path = PathBuf::from("/tmp/");

        Self {
            data_path,
            save_path,
        }
    }
}

impl Config {
    pub fn from_config_file() -> Result<Self, String> {
        let mut config = Self::default();
        #[allow(deprecated)]
        let Some(home) = std::env::home_dir() else {
            return Err("could not determine home directory to load config file".into());
        };
        let config_raw = {
            let path = home.join(PathBuf::from(".spinview"));
            let mut file = std::fs::File::open(path).err_to_string("could not open config file")?;
            let mut buf = String::new();
            file.read_to_string(&mut buf)
                .err_to_string("could not load config file")?;
            buf
        };
        for line in config_raw.lines() {
            // Lines starting with "#" are considered comments.
            if line.starts_with("#") {
                continue;
            }
            let mut iter = line.split("=");
            let key = iter.next();
            let val = iter.next();
            match (key, val) {
                (Some("data_path"), Some(path_str)) => {
                    let path = PathBuf::from_str(path_str)
                        .expect("could not parse 'data_path' as directory name");
                    config.data_path = path;
                }
                (Some("save_path"), Some(path_str)) => {
                    let path = PathBuf::from_str(path_str)
                        .expect("could not parse 'save_path' as directory name");
                    config.save_path = path;
                }
                _ => continue,
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_file() {
        #[allow(unused)]
        let res = Config::from_config_file();
        dbg!(res);
    }
}
