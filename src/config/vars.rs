// src/config/vars.rs

//! `{src}` / `{dist}` / `{tpl}` / `{vendor}` substitution.
//!
//! Only these four names are replaced. Any other brace group is left alone so
//! glob alternations (`*.{scss,sass}`) and command placeholders (`{input}`)
//! survive expansion.

use crate::config::model::PathsSection;

#[derive(Debug, Clone)]
pub struct PathVars {
    vars: Vec<(&'static str, String)>,
}

impl PathVars {
    /// Build the substitution table. `tpl` may itself refer to `{src}`.
    pub fn new(paths: &PathsSection) -> Self {
        let mut vars = vec![
            ("{src}", paths.src.clone()),
            ("{dist}", paths.dist.clone()),
            ("{vendor}", paths.vendor.clone()),
        ];
        let tpl = Self { vars: vars.clone() }.expand(&paths.tpl);
        vars.push(("{tpl}", tpl));
        Self { vars }
    }

    /// The paths section with `tpl` resolved.
    pub fn expanded_paths(&self, paths: &PathsSection) -> PathsSection {
        PathsSection {
            src: paths.src.clone(),
            dist: paths.dist.clone(),
            tpl: self.expand(&paths.tpl),
            vendor: paths.vendor.clone(),
        }
    }

    pub fn expand(&self, input: &str) -> String {
        let mut out = input.to_string();
        for (key, value) in &self.vars {
            if out.contains(key) {
                out = out.replace(key, value);
            }
        }
        out
    }

    pub fn expand_all(&self, inputs: &[String]) -> Vec<String> {
        inputs.iter().map(|s| self.expand(s)).collect()
    }

    /// Expand every string nested inside a TOML value (option bags).
    pub fn expand_value(&self, value: &mut toml::Value) {
        match value {
            toml::Value::String(s) => *s = self.expand(s),
            toml::Value::Array(items) => {
                for item in items {
                    self.expand_value(item);
                }
            }
            toml::Value::Table(table) => {
                for (_, item) in table.iter_mut() {
                    self.expand_value(item);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_vars_and_keeps_glob_braces() {
        let vars = PathVars::new(&PathsSection::default());
        assert_eq!(vars.expand("{tpl}/page/*.hbs"), "src/template/page/*.hbs");
        assert_eq!(
            vars.expand("{src}/css/{,*/}*.{scss,sass}"),
            "src/css/{,*/}*.{scss,sass}"
        );
        assert_eq!(vars.expand("{dist}/{input}"), "dist/{input}");
    }

    #[test]
    fn expands_nested_option_values() {
        let vars = PathVars::new(&PathsSection::default());
        let mut value = toml::Value::Table(
            toml::from_str(
                r#"layout = "{tpl}/layout/default.hbs"
partials = ["{tpl}/partial/**/*.hbs"]"#,
            )
            .unwrap(),
        );
        vars.expand_value(&mut value);
        assert_eq!(
            value["layout"].as_str(),
            Some("src/template/layout/default.hbs")
        );
        assert_eq!(
            value["partials"][0].as_str(),
            Some("src/template/partial/**/*.hbs")
        );
    }
}
