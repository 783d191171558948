/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// The mosaic registry and text overlays are plain config tables — they
/// carry coordinates and strings, never logic.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::mosaic::MosaicSpec;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: Tuning,
    pub map: MapConfig,
    pub gamepad: GamepadConfig,
    pub mosaics: Vec<MosaicSpec>,
    pub texts: Vec<TextOverlay>,
}

#[derive(Clone, Debug)]
pub struct Tuning {
    pub tick_rate_ms: u64,
    pub boost_mult: u32,
    pub base_len: usize,
    pub max_len: usize,
    pub grows_on_eat: bool,
    pub pausable: bool,
    pub margin: i32,
    pub lerp: f32,
    pub shake: f32,
    pub min_tail_scale: f32,
}

#[derive(Clone, Debug)]
pub struct MapConfig {
    pub path: PathBuf,
    /// Dimensions used when generating a fresh map (no file present).
    pub cols: usize,
    pub rows: usize,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub boost: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TextOverlay {
    pub text: String,
    pub x: i32,
    pub y: i32,
    /// Palette symbol the glyph cells are painted with.
    pub color: char,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    tuning: TomlTuning,
    #[serde(default)]
    map: TomlMap,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    mosaic: Vec<TomlMosaic>,
    #[serde(default)]
    text: Vec<TomlText>,
}

#[derive(Deserialize, Debug)]
struct TomlTuning {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_boost_mult")]
    boost_mult: u32,
    #[serde(default = "default_base_len")]
    base_len: usize,
    #[serde(default = "default_max_len")]
    max_len: usize,
    #[serde(default)]
    grows_on_eat: bool,
    #[serde(default = "default_true")]
    pausable: bool,
    #[serde(default = "default_margin")]
    margin: i32,
    #[serde(default = "default_lerp")]
    lerp: f32,
    #[serde(default = "default_shake")]
    shake: f32,
    #[serde(default = "default_tail_scale")]
    min_tail_scale: f32,
}

#[derive(Deserialize, Debug)]
struct TomlMap {
    #[serde(default = "default_map_path")]
    path: String,
    #[serde(default = "default_map_dim")]
    cols: usize,
    #[serde(default = "default_map_dim")]
    rows: usize,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_boost_buttons")]
    boost: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlMosaic {
    image: String,
    offset_x: i32,
    offset_y: i32,
    blocks: usize,
    #[serde(default)]
    tooltip: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    solid: bool,
}

#[derive(Deserialize, Debug)]
struct TomlText {
    text: String,
    x: i32,
    y: i32,
    #[serde(default = "default_text_color")]
    color: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 100 }
fn default_boost_mult() -> u32 { 3 }
fn default_base_len() -> usize { 5 }
fn default_max_len() -> usize { 40 }
fn default_true() -> bool { true }
fn default_margin() -> i32 { 10 }
fn default_lerp() -> f32 { 0.18 }
fn default_shake() -> f32 { 0.6 }
fn default_tail_scale() -> f32 { 0.8 }
fn default_map_path() -> String { "map.txt".into() }
fn default_map_dim() -> usize { 500 }
fn default_boost_buttons() -> Vec<String> { vec!["A".into()] }
fn default_text_color() -> String { "4".into() }

impl Default for TomlTuning {
    fn default() -> Self {
        TomlTuning {
            tick_rate_ms: default_tick_rate(),
            boost_mult: default_boost_mult(),
            base_len: default_base_len(),
            max_len: default_max_len(),
            grows_on_eat: false,
            pausable: true,
            margin: default_margin(),
            lerp: default_lerp(),
            shake: default_shake(),
            min_tail_scale: default_tail_scale(),
        }
    }
}

impl Default for TomlMap {
    fn default() -> Self {
        TomlMap {
            path: default_map_path(),
            cols: default_map_dim(),
            rows: default_map_dim(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad { boost: default_boost_buttons() }
    }
}

// ── Loading ──

impl Default for GameConfig {
    /// Built-in defaults, no file I/O.
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[PathBuf::from(".")])
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let map_path = resolve_path(&toml_cfg.map.path, search_dirs);

        let mosaics = toml_cfg
            .mosaic
            .into_iter()
            .map(|m| MosaicSpec {
                image: resolve_path(&m.image, search_dirs),
                offset_x: m.offset_x,
                offset_y: m.offset_y,
                blocks: m.blocks.max(1),
                tooltip: m.tooltip,
                href: m.href,
                solid: m.solid,
            })
            .collect();

        let texts = toml_cfg
            .text
            .into_iter()
            .map(|t| TextOverlay {
                text: t.text,
                x: t.x,
                y: t.y,
                color: t.color.chars().next().unwrap_or('4'),
            })
            .collect();

        GameConfig {
            tuning: Tuning {
                tick_rate_ms: toml_cfg.tuning.tick_rate_ms.max(1),
                boost_mult: toml_cfg.tuning.boost_mult.max(1),
                base_len: toml_cfg.tuning.base_len.max(1),
                max_len: toml_cfg.tuning.max_len.max(toml_cfg.tuning.base_len.max(1)),
                grows_on_eat: toml_cfg.tuning.grows_on_eat,
                pausable: toml_cfg.tuning.pausable,
                margin: toml_cfg.tuning.margin.max(0),
                lerp: toml_cfg.tuning.lerp.clamp(0.01, 1.0),
                shake: toml_cfg.tuning.shake.max(0.0),
                min_tail_scale: toml_cfg.tuning.min_tail_scale.clamp(0.05, 1.0),
            },
            map: MapConfig {
                path: map_path,
                cols: toml_cfg.map.cols.max(16),
                rows: toml_cfg.map.rows.max(16),
            },
            gamepad: GamepadConfig { boost: toml_cfg.gamepad.boost },
            mosaics,
            texts,
        }
    }
}

/// Resolve a config-relative path: absolute paths pass through, relative
/// paths prefer the first candidate dir where the file exists.
fn resolve_path(raw: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p;
    }
    search_dirs
        .iter()
        .map(|d| d.join(raw))
        .find(|candidate| candidate.exists())
        .unwrap_or(p)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_documented_defaults() {
        let cfg = GameConfig::from_toml(
            toml::from_str::<TomlConfig>("").unwrap(),
            &[PathBuf::from(".")],
        );
        assert_eq!(cfg.tuning.tick_rate_ms, 100);
        assert_eq!(cfg.tuning.boost_mult, 3);
        assert_eq!(cfg.tuning.base_len, 5);
        assert!(!cfg.tuning.grows_on_eat);
        assert!(cfg.tuning.pausable);
        assert_eq!(cfg.tuning.margin, 10);
        assert!((cfg.tuning.lerp - 0.18).abs() < 1e-6);
        assert_eq!(cfg.map.cols, 500);
        assert!(cfg.mosaics.is_empty());
        assert!(cfg.texts.is_empty());
    }

    #[test]
    fn mosaic_and_text_tables_parse() {
        let text = r#"
            [tuning]
            grows_on_eat = true

            [[mosaic]]
            image = "images/logo.png"
            offset_x = 214
            offset_y = 277
            blocks = 15
            tooltip = "A logo"
            href = "https://example.com"
            solid = true

            [[text]]
            text = "HELLO"
            x = 240
            y = 200
            color = "p"
        "#;
        let cfg = GameConfig::from_toml(
            toml::from_str::<TomlConfig>(text).unwrap(),
            &[PathBuf::from(".")],
        );
        assert!(cfg.tuning.grows_on_eat);
        assert_eq!(cfg.mosaics.len(), 1);
        assert_eq!(cfg.mosaics[0].blocks, 15);
        assert!(cfg.mosaics[0].solid);
        assert_eq!(cfg.texts[0].color, 'p');
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let text = r#"
            [tuning]
            tick_rate_ms = 0
            boost_mult = 0
            base_len = 0
            lerp = 9.0
        "#;
        let cfg = GameConfig::from_toml(
            toml::from_str::<TomlConfig>(text).unwrap(),
            &[PathBuf::from(".")],
        );
        assert_eq!(cfg.tuning.tick_rate_ms, 1);
        assert_eq!(cfg.tuning.boost_mult, 1);
        assert_eq!(cfg.tuning.base_len, 1);
        assert!(cfg.tuning.lerp <= 1.0);
    }
}
