#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// Not every test binary uses every helper.
#[allow(unused_imports)]
pub use sitepipe_test_utils::{builders, init_tracing, with_timeout};

/// Config for the small site written by [`write_site`].
pub const SITE_CONFIG: &str = r#"
[paths]
src = "src"
dist = "dist"

[config]
debounce_ms = 50

[task.clean]
kind = "clean"
output = "{dist}"
options = { keep = [".git*"] }

[task.assemble]
kind = "template"
cwd = "{src}/pages"
inputs = ["*.hbs"]
output = "{dist}"
options = { layout = "{tpl}/layout.hbs", partials = ["{tpl}/partials/*.hbs"], data = ["{src}/data/*.json"] }

[task."sass:dist"]
kind = "sass"
cwd = "{src}/css"
inputs = ["*.scss"]
output = "{dist}/css"

[task.autoprefixer]
kind = "autoprefix"
cwd = "{dist}/css"
inputs = ["*.css"]
options = { browsers = ["safari 10"] }

[task."copy:dist"]
kind = "copy"
cwd = "{src}"
inputs = ["*.ico", "image/**/*"]
output = "{dist}"

[task."copy:fonts"]
kind = "copy"
cwd = "{src}/fonts"
inputs = ["*.woff"]
output = "{dist}/fonts"

[task.concat]
kind = "concat"
cwd = "{src}/js"
inputs = ["a.js", "b.js"]
output = "{dist}/js/app.js"
options = { separator = ";\n" }

[task.cssmin]
kind = "css_minify"
cwd = "{dist}/css"
inputs = ["*.css"]
output = "{dist}/css/site.min.css"

[task.htmlhint]
kind = "command"
options = { program = "sh", args = ["-c", "echo 'index.html: tag not closed' >&2; exit 1"], lint = true }

[macro]
build = ["clean", ["assemble", "sass:dist", "copy"], "autoprefixer"]
optimize = ["build", ["concat", "cssmin"]]
qa = ["htmlhint"]
"qa:html" = ["htmlhint"]

[[watch]]
name = "sass"
files = ["{src}/css/**/*.scss"]
tasks = ["sass:dist", "autoprefixer"]
livereload = true

[[watch]]
name = "assemble"
files = ["{src}/**/*.hbs", "{src}/data/*.json"]
tasks = ["assemble"]
livereload = true

[[watch]]
name = "livereload"
files = ["{src}/image/**/*", "{src}/js/**/*.js"]
livereload = true
"#;

/// Write `SITE_CONFIG` plus its sources into `root`.
pub fn write_site(root: &Path) -> PathBuf {
    let files: &[(&str, &str)] = &[
        ("src/pages/index.hbs", "{% include \"nav\" %}<p>{{ site.title }}</p>"),
        ("src/pages/about.hbs", "{% include \"nav\" %}<p>About {{ site.title }}</p>"),
        ("src/template/layout.hbs", "<html><title>{{ site.title }}</title>{{ body }}</html>"),
        ("src/template/partials/nav.hbs", "<nav>{{ page.name }}</nav>"),
        ("src/data/site.json", r#"{ "title": "Sitepipe" }"#),
        ("src/css/_vars.scss", "$accent: #ff0000;\n"),
        (
            "src/css/main.scss",
            "@import \"vars\";\n.box { user-select: none; color: $accent; }\n",
        ),
        ("src/favicon.ico", "ico"),
        ("src/image/logo.png", "png"),
        ("src/fonts/body.woff", "woff"),
        ("src/js/a.js", "var a = 1"),
        ("src/js/b.js", "var b = 2"),
        ("dist/.gitkeep", ""),
        ("dist/stale.html", "old"),
    ];
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
    }

    let config = root.join("Sitepipe.toml");
    fs::write(&config, SITE_CONFIG).unwrap();
    config
}

/// Every file below `dir`, keyed by its path relative to `dir`.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}
