/*!
 * Starfinder CLI Style System
 *
 * Themed text, icons and tables for terminal output.
 */

use std::time::Duration;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{measure_text_width, style, StyledObject};

use crate::core::cache::CacheEntryInfo;
use crate::core::model::StarSystem;
use crate::core::search::{Notice, NoticeLevel};

// ============================================================================
// THEME COLORS
// ============================================================================

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    pub fn bold<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).bold()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }

    /// Star names in result listings
    pub fn star<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";

    pub const STAR: &'static str = "⭐";
    pub const TELESCOPE: &'static str = "🔭";
    pub const SATELLITE: &'static str = "🛰";
    pub const FOLDER: &'static str = "📁";
    pub const FILE: &'static str = "📄";
    pub const GEAR: &'static str = "⚙";

    pub const ARROW_RIGHT: &'static str = "→";
}

// ============================================================================
// RESULT COUNT
// ============================================================================

/// How crowded a neighbourhood is: up to 20 systems is green, up to 35
/// yellow, anything above red
pub fn count_color(count: usize) -> Color {
    match count {
        0..=20 => Color::Green,
        21..=35 => Color::Yellow,
        _ => Color::Red,
    }
}

/// Result count styled with [`count_color`]
pub fn styled_count(count: usize) -> StyledObject<usize> {
    let styled = style(count).bold();
    match count_color(count) {
        Color::Green => styled.green(),
        Color::Yellow => styled.yellow(),
        _ => styled.red(),
    }
}

// ============================================================================
// BOX DRAWING
// ============================================================================

/// Draw a section header with a line
pub fn section_header(title: &str) {
    let line_len = 50 - title.len().min(40);
    println!(
        "\n{} {}",
        Theme::header(title),
        Theme::muted("─".repeat(line_len))
    );
}

/// Draw notices from a search in a box, one paragraph each
pub fn notice_box(notices: &[Notice]) {
    if notices.is_empty() {
        return;
    }

    let lines: Vec<(NoticeLevel, String)> = notices
        .iter()
        .flat_map(|notice| {
            let rendered = notice.to_string();
            rendered
                .lines()
                .map(|l| (notice.level, l.to_string()))
                .collect::<Vec<_>>()
        })
        .collect();
    let width = lines
        .iter()
        .map(|(_, l)| measure_text_width(l))
        .max()
        .unwrap_or(40)
        .max(45)
        + 2;

    println!(
        "┌── {} {} {}┐",
        Icons::SATELLITE,
        Theme::header("Search Notices"),
        "─".repeat(width.saturating_sub(20))
    );
    for (level, line) in &lines {
        let padding = width.saturating_sub(measure_text_width(line) + 1);
        let text = match level {
            NoticeLevel::Info => Theme::primary(line.as_str()),
            NoticeLevel::Warning => Theme::warning(line.as_str()),
        };
        println!("│ {}{} │", text, " ".repeat(padding));
    }
    println!("└{}┘", "─".repeat(width + 2));
    println!();
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cells(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).fg(Color::Cyan).add_attribute(Attribute::Bold))
        .collect()
}

/// Key-value table for summaries
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

/// Brief view: name, distance, coordinates and spectral class
pub fn results_table(systems: &[StarSystem]) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["#", "Name", "Distance (ly)", "Class", "Coordinates"]));

    for (i, system) in systems.iter().enumerate() {
        let coords = system
            .coords
            .map(|c| c.to_string())
            .unwrap_or_else(|| "x=N/A, y=N/A, z=N/A".to_string());
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&system.name)
                .fg(Color::Yellow)
                .add_attribute(Attribute::Bold),
            Cell::new(format!("{:.2}", system.distance)),
            Cell::new(system.spectral_class()),
            Cell::new(coords).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Detailed view: every non-empty field of one system
pub fn details_table(system: &StarSystem) -> Table {
    let mut table = create_minimal_table();
    for (key, value) in system.detail_fields() {
        table.add_row(vec![Cell::new(key).fg(Color::Cyan), Cell::new(value)]);
    }
    table
}

/// Cache listing with freshness against `ttl`
pub fn cache_table(entries: &[CacheEntryInfo], ttl: Duration) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["Entry", "Size", "Age", "Status"]));

    for entry in entries {
        let (age, status) = match entry.age() {
            Some(age) if age <= ttl => (
                format_duration(age.as_secs_f64()),
                Cell::new(format!("{} fresh", Icons::SUCCESS)).fg(Color::Green),
            ),
            Some(age) => (
                format_duration(age.as_secs_f64()),
                Cell::new(format!("{} stale", Icons::WARNING)).fg(Color::Yellow),
            ),
            None => ("?".to_string(), Cell::new("unknown").fg(Color::DarkGrey)),
        };
        table.add_row(vec![
            Cell::new(&entry.key),
            Cell::new(format_bytes(entry.size)),
            Cell::new(age),
            status,
        ]);
    }

    table
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        let remaining = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining)
    } else if secs < 86400.0 {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours, mins)
    } else {
        let days = (secs / 86400.0).floor();
        let hours = ((secs % 86400.0) / 3600.0).floor();
        format!("{}d {}h", days, hours)
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}

pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}

// ============================================================================
// BANNER
// ============================================================================

pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!(
        "{}",
        Theme::primary("  ╭─────────────────────────────────────────────────╮")
    );
    println!(
        "{}           {}            {}",
        Theme::primary("  │"),
        Theme::header("⭐ S T A R F I N D E R"),
        Theme::primary("│")
    );
    println!(
        "{}      {}      {}",
        Theme::primary("  │"),
        Theme::muted("Nearby star systems from EDSM"),
        Theme::primary("│")
    );
    println!(
        "{}                  {}                   {}",
        Theme::primary("  │"),
        Theme::muted(format!("v{}", version)),
        Theme::primary("│")
    );
    println!(
        "{}",
        Theme::primary("  ╰─────────────────────────────────────────────────╯")
    );
    println!();
}

// ============================================================================
// TESTS
// ============================================================================
