/// Bundler build profiles for the client and server targets.
///
/// `BuildProfile::new` is a pure function of the configuration: it decides
/// entries, transform rules, plugins, output templates and dev-server options
/// from the `debug`, `verbose`, `staging` and `force_polyfill` switches. The
/// result is printed as JSON by `ozea --plan` for the bundler to consume.
use crate::config::{OzeaConfig, Target};
use crate::launcher::LaunchSpec;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

const ASSET_INLINE_LIMIT: u64 = 2500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Node,
    Web,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildProfile {
    pub mode: Mode,
    pub platform: Platform,
    pub entry: BTreeMap<String, Vec<String>>,
    pub output: Output,
    pub watch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtool: Option<String>,
    /// `None` disables performance hints.
    pub performance_hints: Option<String>,
    pub resolve_extensions: Vec<String>,
    pub rules: Vec<Rule>,
    pub plugins: Vec<Plugin>,
    /// Bundler stats preset, detailed when verbose.
    pub stats: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<Optimization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externals: Option<Externals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub path: PathBuf,
    pub filename: String,
    pub chunk_filename: String,
    pub public_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub test: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<PathBuf>,
    pub uses: Vec<LoaderUse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderUse {
    pub loader: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plugin {
    pub name: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Optimization {
    pub runtime_chunk: bool,
    pub split_chunks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevServer {
    pub host: String,
    pub port: Option<u16>,
    pub proxies: Vec<Proxy>,
    pub compress: bool,
    pub hot: bool,
    pub overlay: bool,
    pub quiet: bool,
    pub disable_host_check: bool,
    pub history_fallback: String,
    pub headers: BTreeMap<String, String>,
    pub watch_ignored: String,
    pub stats: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proxy {
    pub context: Vec<String>,
    pub target: String,
    pub log_level: String,
}

/// Node globals the server bundle keeps as real values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOptions {
    #[serde(rename = "__dirname")]
    pub dirname: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Externals {
    pub modules_dir: PathBuf,
    pub allowlist: Vec<String>,
}

impl LoaderUse {
    fn bare(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
            options: Value::Null,
        }
    }

    fn with(loader: &str, options: Value) -> Self {
        Self {
            loader: loader.to_string(),
            options,
        }
    }
}

impl Plugin {
    fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: Value::Null,
        }
    }

    fn with(name: &str, options: Value) -> Self {
        Self {
            name: name.to_string(),
            options,
        }
    }
}

impl BuildProfile {
    /// Assemble the profile for `target`. `node_env` is baked into the
    /// bundle's `process.env.NODE_ENV`.
    pub fn new(config: &OzeaConfig, target: Target, node_env: &str) -> Result<Self, ProfileError> {
        let build = &config.build;
        let debug = build.debug;
        let server = target == Target::Server;
        let name = match target {
            Target::Server => "server",
            Target::Client => "client",
        };

        let mut entry_points = Vec::new();
        if debug && !server {
            entry_points.push(format!(
                "webpack-dev-server/client?{}",
                config.urls.assets_url.as_str()
            ));
        }
        if (!debug || build.force_polyfill) && !server {
            entry_points.push("regenerator-runtime/runtime.js".to_string());
        }
        entry_points.push(build.src_dir.join(name).to_string_lossy().into_owned());
        let mut entry = BTreeMap::new();
        entry.insert(name.to_string(), entry_points);

        let filename = if debug || server {
            "[name].js"
        } else {
            "[name].[chunkhash].js"
        };

        let profile = Self {
            mode: if debug {
                Mode::Development
            } else {
                Mode::Production
            },
            platform: if server { Platform::Node } else { Platform::Web },
            entry,
            output: Output {
                path: if server {
                    config.server.dist_dir.clone()
                } else {
                    build.assets_dir.clone()
                },
                filename: filename.to_string(),
                chunk_filename: filename.to_string(),
                public_path: config.urls.public_path.clone(),
                library_target: server.then(|| "commonjs2".to_string()),
            },
            watch: debug && server,
            devtool: (debug && server).then(|| "inline-source-map".to_string()),
            performance_hints: (!debug && !server).then(|| "warning".to_string()),
            resolve_extensions: [".mjs", ".js", ".jsx"].map(String::from).to_vec(),
            rules: rules(config, target),
            plugins: plugins(config, target, node_env),
            stats: stats(build.verbose),
            optimization: (!server).then(|| Optimization {
                runtime_chunk: true,
                split_chunks: "all".to_string(),
            }),
            dev_server: (!server).then(|| dev_server(config)),
            externals: server.then(|| Externals {
                modules_dir: build.modules_dir.clone(),
                allowlist: vec![r"\.css$".to_string()],
            }),
            node: server.then_some(NodeOptions { dirname: true }),
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Every rule pattern must compile.
    fn validate(&self) -> Result<(), ProfileError> {
        for rule in &self.rules {
            for pattern in std::iter::once(&rule.test).chain(rule.exclude.as_ref()) {
                Regex::new(pattern).map_err(|e| ProfileError::Pattern {
                    pattern: pattern.clone(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ProfileError> {
        serde_json::to_string_pretty(self).map_err(|e| ProfileError::Serialize { source: e })
    }
}

fn rules(config: &OzeaConfig, target: Target) -> Vec<Rule> {
    let build = &config.build;
    let debug = build.debug;

    let env_targets = match target {
        Target::Server => json!({ "node": true }),
        Target::Client if debug && !build.force_polyfill => {
            json!({ "browsers": ["last 1 Chrome version"] })
        }
        Target::Client => json!({ "browsers": ["> .5% in FR"] }),
    };
    let mut rules = vec![
        Rule {
            test: r"\.jsx?$".to_string(),
            exclude: None,
            include: Some(build.src_dir.clone()),
            uses: vec![LoaderUse::with(
                "babel-loader",
                json!({
                    "cacheDirectory": true,
                    "babelrc": false,
                    "sourceType": "unambiguous",
                    "presets": [
                        "@babel/preset-react",
                        ["@babel/preset-env", {
                            "targets": env_targets,
                            "modules": false,
                            "debug": build.verbose,
                        }],
                    ],
                    "plugins": [
                        "@babel/plugin-proposal-export-default-from",
                        "@babel/plugin-syntax-dynamic-import",
                        "@babel/plugin-proposal-object-rest-spread",
                        ["@babel/plugin-proposal-decorators", { "legacy": true }],
                        "add-react-static-displayname",
                        ["@babel/plugin-proposal-class-properties", { "loose": true }],
                        "@babel/plugin-transform-runtime",
                    ],
                }),
            )],
        },
        Rule {
            test: r"(?i)\.(jpe?g|png|gif|svg|ttf|woff|woff2|eot|pdf)$".to_string(),
            exclude: None,
            include: None,
            uses: vec![LoaderUse::with(
                "url-loader",
                json!({ "limit": ASSET_INLINE_LIMIT }),
            )],
        },
    ];

    if target == Target::Server {
        rules.push(Rule {
            test: r"\.(css|sass)$".to_string(),
            exclude: None,
            include: None,
            uses: vec![LoaderUse::bare("ignore-loader")],
        });
        return rules;
    }

    let style_loader = LoaderUse::bare("style-loader");
    let css_loader = LoaderUse::with("css-loader", json!({ "sourceMap": debug }));
    let sass_to_css = vec![
        css_loader.clone(),
        LoaderUse::with(
            "sass-loader",
            json!({
                "sassOptions": {
                    "includePaths": [&build.src_dir, &build.styles_dir, &build.modules_dir],
                },
            }),
        ),
    ];

    let sass_head = if debug {
        style_loader.clone()
    } else {
        LoaderUse::bare("mini-css-extract-plugin/loader")
    };
    rules.push(Rule {
        test: r"(?i)\.sass$".to_string(),
        exclude: Some(r"(?i)\.lazy\.sass$".to_string()),
        include: None,
        uses: std::iter::once(sass_head)
            .chain(sass_to_css.iter().cloned())
            .collect(),
    });

    // lazily injected styles are dropped from production bundles
    let lazy_uses = if debug {
        std::iter::once(LoaderUse::with(
            "style-loader",
            json!({ "injectType": "lazyStyleTag" }),
        ))
        .chain(sass_to_css)
        .collect()
    } else {
        vec![LoaderUse::bare("ignore-loader")]
    };
    rules.push(Rule {
        test: r"(?i)\.lazy\.sass$".to_string(),
        exclude: None,
        include: None,
        uses: lazy_uses,
    });

    rules.push(Rule {
        test: r"(?i)\.css$".to_string(),
        exclude: None,
        include: None,
        uses: vec![style_loader, css_loader],
    });
    rules
}

fn plugins(config: &OzeaConfig, target: Target, node_env: &str) -> Vec<Plugin> {
    let build = &config.build;
    let debug = build.debug;

    let mut plugins = vec![
        Plugin::with("ManifestPlugin", json!({ "writeToFileEmit": true })),
        // values are spliced into source code, hence the nested quotes
        Plugin::with(
            "DefinePlugin",
            json!({
                "process.env.NODE_ENV": format!("\"{node_env}\""),
                "process.env.STAGING": build.staging.to_string(),
            }),
        ),
    ];

    match target {
        Target::Server => {
            if debug {
                let spec = LaunchSpec::from_config(&config.server);
                plugins.push(Plugin::with(
                    "ServerDevPlugin",
                    json!({
                        "entry": spec.entry,
                        "cwd": spec.cwd,
                        "inspect": config.server.inspect,
                    }),
                ));
            }
        }
        Target::Client => {
            plugins.push(Plugin::with(
                "BundleAnalyzerPlugin",
                json!({
                    "analyzerMode": "static",
                    "openAnalyzer": false,
                    "logLevel": if build.verbose { "info" } else { "error" },
                }),
            ));
            if debug {
                plugins.push(Plugin::bare("HotModuleReplacementPlugin"));
                if build.render_html {
                    plugins.push(Plugin::with("HtmlPlugin", json!({ "asset": "index.html" })));
                }
                plugins.push(Plugin::bare("ClientDevPlugin"));
            } else {
                plugins.push(Plugin::with(
                    "MiniCssExtractPlugin",
                    json!({
                        "filename": "[name].[chunkhash].css",
                        "chunkFilename": "[name].[chunkhash].css",
                    }),
                ));
            }
        }
    }
    plugins
}

fn dev_server(config: &OzeaConfig) -> DevServer {
    let urls = &config.urls;
    let log_level = if config.build.verbose { "debug" } else { "warn" };
    let proxy = |context: &[&str], target: &url::Url| Proxy {
        context: context.iter().map(|c| c.to_string()).collect(),
        target: target.as_str().to_string(),
        log_level: log_level.to_string(),
    };

    let mut headers = BTreeMap::new();
    headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());

    DevServer {
        host: urls.assets_url.host_str().unwrap_or("localhost").to_string(),
        port: urls.assets_url.port_or_known_default(),
        proxies: vec![
            proxy(&["/api"][..], &urls.api_url),
            proxy(&["/static", "/favicon.ico"][..], &urls.server_url),
        ],
        compress: true,
        hot: true,
        overlay: true,
        quiet: !config.build.verbose,
        disable_host_check: true,
        history_fallback: "/assets/index.html".to_string(),
        headers,
        watch_ignored: "node_modules".to_string(),
        stats: stats(config.build.verbose),
    }
}

/// Verbose builds report chunks, exports and module reasons; otherwise only
/// errors (with details) are shown.
fn stats(verbose: bool) -> Value {
    if verbose {
        json!({
            "entrypoints": true,
            "chunks": true,
            "chunkModules": false,
            "chunkOrigins": true,
            "colors": true,
            "depth": true,
            "usedExports": true,
            "providedExports": true,
            "optimizationBailout": true,
            "errorDetails": true,
            "publicPath": true,
            "performance": true,
            "reasons": true,
            "exclude": false,
            "maxModules": u32::MAX,
            "warnings": true,
        })
    } else {
        json!({
            "assets": false,
            "cached": false,
            "cachedAssets": false,
            "children": false,
            "chunks": false,
            "chunkModules": false,
            "chunkOrigins": false,
            "colors": true,
            "depth": false,
            "entrypoints": false,
            "env": false,
            "errors": true,
            "errorDetails": true,
            "hash": false,
            "modules": false,
            "moduleTrace": false,
            "performance": false,
            "providedExports": false,
            "publicPath": false,
            "reasons": false,
            "source": false,
            "timings": false,
            "usedExports": false,
            "version": false,
            "warnings": false,
        })
    }
}

/// Errors from building a profile.
#[derive(Debug)]
pub enum ProfileError {
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    Serialize {
        source: serde_json::Error,
    },
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::Pattern { pattern, source } => {
                write!(f, "invalid rule pattern {:?}: {}", pattern, source)
            }
            ProfileError::Serialize { source } => {
                write!(f, "failed to serialize build profile: {}", source)
            }
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::Pattern { source, .. } => Some(source),
            ProfileError::Serialize { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(debug: bool) -> OzeaConfig {
        let mut config = OzeaConfig::default();
        config.build.debug = debug;
        config
    }

    fn profile(config: &OzeaConfig, target: Target) -> BuildProfile {
        BuildProfile::new(config, target, "development").unwrap()
    }

    fn plugin_names(profile: &BuildProfile) -> Vec<&str> {
        profile.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    fn rule<'a>(profile: &'a BuildProfile, test: &str) -> &'a Rule {
        profile
            .rules
            .iter()
            .find(|r| r.test == test)
            .unwrap_or_else(|| panic!("no rule for {test}"))
    }

    #[test]
    fn test_debug_server_profile() {
        let p = profile(&config(true), Target::Server);
        assert_eq!(p.mode, Mode::Development);
        assert_eq!(p.platform, Platform::Node);
        assert!(p.watch);
        assert_eq!(p.devtool.as_deref(), Some("inline-source-map"));
        assert_eq!(p.entry["server"], vec!["src/server".to_string()]);
        assert_eq!(p.output.path, PathBuf::from("dist"));
        assert_eq!(p.output.filename, "[name].js");
        assert_eq!(p.output.library_target.as_deref(), Some("commonjs2"));
        assert_eq!(p.performance_hints, None);
        assert!(p.dev_server.is_none());
        assert!(p.optimization.is_none());
        let externals = p.externals.as_ref().unwrap();
        assert_eq!(externals.modules_dir, PathBuf::from("node_modules"));
        assert_eq!(externals.allowlist, vec![r"\.css$".to_string()]);
        assert_eq!(
            plugin_names(&p),
            vec!["ManifestPlugin", "DefinePlugin", "ServerDevPlugin"]
        );
    }

    #[test]
    fn test_production_server_profile() {
        let p = profile(&config(false), Target::Server);
        assert_eq!(p.mode, Mode::Production);
        assert!(!p.watch);
        assert_eq!(p.devtool, None);
        assert_eq!(p.output.filename, "[name].js");
        assert_eq!(plugin_names(&p), vec!["ManifestPlugin", "DefinePlugin"]);
    }

    #[test]
    fn test_server_ignores_styles() {
        let p = profile(&config(true), Target::Server);
        let styles = rule(&p, r"\.(css|sass)$");
        assert_eq!(styles.uses, vec![LoaderUse::bare("ignore-loader")]);
        let babel = &rule(&p, r"\.jsx?$").uses[0];
        assert_eq!(babel.options["presets"][1][1]["targets"], json!({ "node": true }));
    }

    #[test]
    fn test_debug_client_profile() {
        let p = profile(&config(true), Target::Client);
        assert_eq!(p.platform, Platform::Web);
        assert!(!p.watch);
        assert_eq!(
            p.entry["client"],
            vec![
                "webpack-dev-server/client?http://localhost:7000/assets/".to_string(),
                "src/client".to_string(),
            ]
        );
        assert_eq!(p.output.path, PathBuf::from("assets"));
        assert_eq!(p.output.filename, "[name].js");
        assert_eq!(p.output.library_target, None);
        assert_eq!(p.performance_hints, None);
        assert_eq!(
            plugin_names(&p),
            vec![
                "ManifestPlugin",
                "DefinePlugin",
                "BundleAnalyzerPlugin",
                "HotModuleReplacementPlugin",
                "HtmlPlugin",
                "ClientDevPlugin",
            ]
        );
        let optimization = p.optimization.as_ref().unwrap();
        assert!(optimization.runtime_chunk);
        assert_eq!(optimization.split_chunks, "all");
    }

    #[test]
    fn test_production_client_profile() {
        let p = profile(&config(false), Target::Client);
        assert_eq!(
            p.entry["client"],
            vec![
                "regenerator-runtime/runtime.js".to_string(),
                "src/client".to_string(),
            ]
        );
        assert_eq!(p.output.filename, "[name].[chunkhash].js");
        assert_eq!(p.output.chunk_filename, "[name].[chunkhash].js");
        assert_eq!(p.performance_hints.as_deref(), Some("warning"));
        assert_eq!(
            plugin_names(&p),
            vec![
                "ManifestPlugin",
                "DefinePlugin",
                "BundleAnalyzerPlugin",
                "MiniCssExtractPlugin",
            ]
        );
        let sass = rule(&p, r"(?i)\.sass$");
        assert_eq!(sass.uses[0].loader, "mini-css-extract-plugin/loader");
        let lazy = rule(&p, r"(?i)\.lazy\.sass$");
        assert_eq!(lazy.uses, vec![LoaderUse::bare("ignore-loader")]);
    }

    #[test]
    fn test_force_polyfill_in_debug() {
        let mut c = config(true);
        c.build.force_polyfill = true;
        let p = profile(&c, Target::Client);
        assert_eq!(p.entry["client"].len(), 3);
        assert_eq!(p.entry["client"][1], "regenerator-runtime/runtime.js");
        let babel = &rule(&p, r"\.jsx?$").uses[0];
        assert_eq!(
            babel.options["presets"][1][1]["targets"]["browsers"],
            json!(["> .5% in FR"])
        );
    }

    #[test]
    fn test_debug_client_targets_latest_chrome() {
        let p = profile(&config(true), Target::Client);
        let babel = &rule(&p, r"\.jsx?$").uses[0];
        assert_eq!(
            babel.options["presets"][1][1]["targets"]["browsers"],
            json!(["last 1 Chrome version"])
        );
    }

    #[test]
    fn test_debug_client_sass_chain() {
        let p = profile(&config(true), Target::Client);
        let sass = rule(&p, r"(?i)\.sass$");
        let loaders: Vec<&str> = sass.uses.iter().map(|u| u.loader.as_str()).collect();
        assert_eq!(loaders, vec!["style-loader", "css-loader", "sass-loader"]);
        assert_eq!(sass.uses[1].options, json!({ "sourceMap": true }));
        let lazy = rule(&p, r"(?i)\.lazy\.sass$");
        assert_eq!(lazy.uses[0].options, json!({ "injectType": "lazyStyleTag" }));
        assert_eq!(lazy.uses.len(), 3);
    }

    #[test]
    fn test_render_html_off_drops_html_plugin() {
        let mut c = config(true);
        c.build.render_html = false;
        let p = profile(&c, Target::Client);
        assert!(!plugin_names(&p).contains(&"HtmlPlugin"));
    }

    #[test]
    fn test_define_plugin_values() {
        let mut c = config(true);
        c.build.staging = true;
        let p = BuildProfile::new(&c, Target::Server, "production").unwrap();
        let define = &p.plugins[1].options;
        assert_eq!(define["process.env.NODE_ENV"], "\"production\"");
        assert_eq!(define["process.env.STAGING"], "true");
    }

    #[test]
    fn test_server_dev_plugin_carries_launch_settings() {
        let mut c = config(true);
        c.server.inspect = true;
        let p = profile(&c, Target::Server);
        let dev = &p.plugins[2].options;
        assert_eq!(dev["inspect"], true);
        assert!(dev["entry"].as_str().unwrap().ends_with("dist/server.js"));
    }

    #[test]
    fn test_dev_server_proxies() {
        let p = profile(&config(true), Target::Client);
        let server = p.dev_server.as_ref().unwrap();
        assert_eq!(server.host, "localhost");
        assert_eq!(server.port, Some(7000));
        assert_eq!(server.proxies.len(), 2);
        assert_eq!(server.proxies[0].context, vec!["/api"]);
        assert_eq!(server.proxies[0].target, "http://localhost:8000/api/");
        assert_eq!(server.proxies[1].context, vec!["/static", "/favicon.ico"]);
        assert_eq!(server.proxies[1].target, "http://localhost:8000/");
        assert_eq!(server.proxies[0].log_level, "warn");
        assert!(server.quiet);
        assert_eq!(server.headers["Access-Control-Allow-Origin"], "*");
    }

    #[test]
    fn test_verbose_raises_log_levels() {
        let mut c = config(true);
        c.build.verbose = true;
        let p = profile(&c, Target::Client);
        let server = p.dev_server.as_ref().unwrap();
        assert_eq!(server.proxies[0].log_level, "debug");
        assert!(!server.quiet);
        let analyzer = p.plugins.iter().find(|p| p.name == "BundleAnalyzerPlugin").unwrap();
        assert_eq!(analyzer.options["logLevel"], "info");
    }

    #[test]
    fn test_quiet_stats_show_only_errors() {
        let p = profile(&config(true), Target::Server);
        assert_eq!(p.stats["errors"], true);
        assert_eq!(p.stats["errorDetails"], true);
        assert_eq!(p.stats["warnings"], false);
        assert_eq!(p.stats["modules"], false);
        assert_eq!(p.stats["timings"], false);
        assert_eq!(p.stats["reasons"], false);
    }

    #[test]
    fn test_verbose_stats_are_detailed() {
        let mut c = config(true);
        c.build.verbose = true;
        let p = profile(&c, Target::Client);
        assert_eq!(p.stats["reasons"], true);
        assert_eq!(p.stats["usedExports"], true);
        assert_eq!(p.stats["chunkModules"], false);
        assert_eq!(p.stats["warnings"], true);
        assert!(p.stats.get("timings").is_none());
        // the dev server reports with the same preset
        assert_eq!(p.dev_server.as_ref().unwrap().stats, p.stats);
    }

    #[test]
    fn test_node_dirname_only_for_server() {
        let server = profile(&config(false), Target::Server);
        assert_eq!(server.node, Some(NodeOptions { dirname: true }));
        let value: Value = serde_json::from_str(&server.to_json().unwrap()).unwrap();
        assert_eq!(value["node"]["__dirname"], true);

        let client = profile(&config(false), Target::Client);
        assert_eq!(client.node, None);
        let value: Value = serde_json::from_str(&client.to_json().unwrap()).unwrap();
        assert!(value.get("node").is_none());
    }

    #[test]
    fn test_profile_is_deterministic() {
        let c = config(false);
        assert_eq!(profile(&c, Target::Client), profile(&c, Target::Client));
    }

    #[test]
    fn test_all_rule_patterns_compile_and_match() {
        let p = profile(&config(true), Target::Client);
        let sass = Regex::new(&rule(&p, r"(?i)\.sass$").test).unwrap();
        assert!(sass.is_match("theme.SASS"));
        let assets = Regex::new(&p.rules[1].test).unwrap();
        assert!(assets.is_match("logo.PNG"));
        assert!(!assets.is_match("logo.png.js"));
    }

    #[test]
    fn test_json_omits_absent_sections() {
        let json = profile(&config(true), Target::Server).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("dev_server").is_none());
        assert!(value.get("optimization").is_none());
        assert_eq!(value["platform"], "node");
        assert_eq!(value["mode"], "development");
    }
}
