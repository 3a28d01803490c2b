//! Derived results computed by the physics backend and consumed opaquely.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::INTERFERENCE_TABLE_ROWS;

/// One distance-indexed sample of a line-of-sight profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    /// Distance from the transmitter (m).
    pub d_m: f64,
    /// Ground elevation (m).
    pub elev_m: f64,
    /// Height of the direct ray (m).
    pub ray_h_m: f64,
    /// First Fresnel zone radius (m).
    pub f1_m: f64,
}

/// Line-of-sight profile between a transmitter and a receiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LosProfile {
    pub distance_m: f64,
    #[serde(rename = "profile")]
    pub samples: Vec<ProfileSample>,
    #[serde(default)]
    pub has_los: bool,
    #[serde(default, rename = "fspl_dB")]
    pub fspl_db: f64,
    #[serde(default)]
    pub fresnel_clearance_min_pct: f64,
    #[serde(default)]
    pub clearance_worst_point_m: f64,
    /// Elevation data source reported by the backend.
    #[serde(default)]
    pub source: String,
}

impl LosProfile {
    /// One-line summary for the info panel.
    pub fn summary(&self) -> String {
        format!(
            "LOS: {} | FSPL: {:.2} dB | worst Fresnel clearance: {:.1}% | worst clearance: {:.2} m | elevation: {}",
            if self.has_los { "yes" } else { "no" },
            self.fspl_db,
            self.fresnel_clearance_min_pct,
            self.clearance_worst_point_m,
            self.source,
        )
    }
}

/// The best transmitter-to-aircraft link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestLink {
    #[serde(rename = "nombre", alias = "name")]
    pub name: String,
    pub d_km: f64,
    #[serde(rename = "fspl_dB")]
    pub fspl_db: f64,
}

/// Aggregate link statistics shown next to the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsOverview {
    #[serde(default)]
    pub count: u32,
    #[serde(default, rename = "p_total_kW")]
    pub p_total_kw: f64,
    #[serde(default)]
    pub fspl_min: Option<f64>,
    #[serde(default)]
    pub fspl_avg: Option<f64>,
    #[serde(default)]
    pub fspl_max: Option<f64>,
    #[serde(default, rename = "best_fm")]
    pub best: Option<BestLink>,
}

impl fmt::Display for StatsOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "No transmitters.");
        }
        let opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        writeln!(f, "Transmitters: {}", self.count)?;
        writeln!(f, "Total power: {:.2} kW", self.p_total_kw)?;
        write!(
            f,
            "FSPL min/avg/max (TX->aircraft): {} / {} / {} dB",
            opt(self.fspl_min),
            opt(self.fspl_avg),
            opt(self.fspl_max)
        )?;
        if let Some(best) = &self.best {
            write!(
                f,
                "\nBest TX->aircraft: {} (d={:.2} km, FSPL={:.2} dB)",
                best.name, best.d_km, best.fspl_db
            )?;
        }
        Ok(())
    }
}

// --- Interference ---

/// Origin of a spectral component seen by a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterferenceKind {
    #[serde(rename = "carrier")]
    Carrier,
    /// Second-order intermodulation product.
    #[serde(rename = "im2")]
    Im2,
    #[serde(rename = "im3")]
    Im3,
    /// Intermodulation above third order.
    #[serde(rename = "imN")]
    ImN,
}

impl fmt::Display for InterferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InterferenceKind::Carrier => "carrier",
            InterferenceKind::Im2 => "im2",
            InterferenceKind::Im3 => "im3",
            InterferenceKind::ImN => "imN",
        })
    }
}

/// One carrier or intermodulation product inside the receiver window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferenceItem {
    pub kind: InterferenceKind,
    #[serde(rename = "f_MHz")]
    pub f_mhz: f64,
    #[serde(default)]
    pub contributor_ids: Vec<String>,
    #[serde(rename = "raw_level_dBm")]
    pub raw_level_dbm: f64,
    #[serde(rename = "after_filter_dBm")]
    pub after_filter_dbm: f64,
    #[serde(default, rename = "offset_kHz")]
    pub offset_khz: f64,
}

/// Interference analysis for one receiver, as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterferenceResult {
    /// Path loss from each transmitter to the receiver (dB).
    #[serde(default)]
    pub fspl_tx_rx: Vec<f64>,
    #[serde(rename = "rx_power_sum_dBm")]
    pub rx_power_sum_dbm: f64,
    #[serde(default)]
    pub items: Vec<InterferenceItem>,
}

impl InterferenceResult {
    /// Split the items into per-kind tables, keeping backend order and at
    /// most `INTERFERENCE_TABLE_ROWS` rows each. Products above third order
    /// are not tabulated.
    pub fn into_tables(self, receiver_id: impl Into<String>) -> InterferenceTables {
        let mut tables = InterferenceTables {
            receiver_id: receiver_id.into(),
            rx_power_sum_dbm: self.rx_power_sum_dbm,
            total_items: self.items.len(),
            ..Default::default()
        };
        for item in self.items {
            let table = match item.kind {
                InterferenceKind::Carrier => &mut tables.carriers,
                InterferenceKind::Im2 => &mut tables.im2,
                InterferenceKind::Im3 => &mut tables.im3,
                InterferenceKind::ImN => continue,
            };
            if table.len() < INTERFERENCE_TABLE_ROWS {
                table.push(item);
            }
        }
        tables
    }
}

/// Carrier and intermodulation tables for the receiver panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterferenceTables {
    pub receiver_id: String,
    pub rx_power_sum_dbm: f64,
    /// Items in the reply before grouping and truncation.
    pub total_items: usize,
    pub carriers: Vec<InterferenceItem>,
    pub im2: Vec<InterferenceItem>,
    pub im3: Vec<InterferenceItem>,
}

impl InterferenceTables {
    /// Fixed-column text rendering of one table.
    pub fn format_table(items: &[InterferenceItem]) -> String {
        let mut out = format!(
            "{:<8} {:>10} {:>10} {:>12}  IDs",
            "Kind", "f (MHz)", "Raw (dBm)", "Filter (dBm)"
        );
        for item in items {
            out.push_str(&format!(
                "\n{:<8} {:>10.4} {:>10.1} {:>12.1}  {}",
                item.kind,
                item.f_mhz,
                item.raw_level_dbm,
                item.after_filter_dbm,
                item.contributor_ids.join(", ")
            ));
        }
        out
    }
}

impl fmt::Display for InterferenceTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Receiver {}: total power {:.1} dBm",
            self.receiver_id, self.rx_power_sum_dbm
        )?;
        for (title, items) in [
            ("Carriers", &self.carriers),
            ("IM2", &self.im2),
            ("IM3", &self.im3),
        ] {
            write!(f, "\n{title} ({})\n{}\n", items.len(), Self::format_table(items))?;
        }
        Ok(())
    }
}
