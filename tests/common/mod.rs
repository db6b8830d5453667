//! Shared fixtures for integration tests: small but complete data sets for
//! both dashboards, written to a temp directory or served over HTTP.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use gridviz::config::{DashboardConfig, DataConfig};

/// Bus names in the voltage fixture.
pub const BUSES: [&str; 3] = ["b1", "b2", "b3"];

/// Site ids in the EV fixture.
pub const SITES: [i64; 3] = [101, 102, 103];

/// Fixture voltage for `bus` at `timestep`: a small daily swing around 1.0 p.u.
pub fn fixture_voltage(bus: usize, timestep: usize) -> f64 {
    1.0 + 0.001 * (bus as f64 + 1.0) * ((timestep % 24) as f64 - 12.0) / 12.0
}

/// Fixture load for a site at an hourly timestep, in kW.
pub fn fixture_load(site: usize, timestep: usize) -> f64 {
    (100 * (site + 1) + 10 * (timestep % 24)) as f64
}

fn feature_collection(features: &[String]) -> String {
    format!(
        r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
        features.join(",")
    )
}

fn point(lon: f64, lat: f64, props: &str) -> String {
    format!(
        r#"{{"type": "Feature", "geometry": {{"type": "Point", "coordinates": [{lon}, {lat}]}}, "properties": {{{props}}}}}"#
    )
}

/// Every voltage-dashboard source as `(file name, contents)`.
pub fn voltage_files() -> Vec<(&'static str, String)> {
    let mut voltages = BUSES.join(",");
    voltages.push('\n');
    for t in 0..288 {
        let row: Vec<String> = (0..BUSES.len())
            .map(|b| format!("{:.5}", fixture_voltage(b, t)))
            .collect();
        voltages.push_str(&row.join(","));
        voltages.push('\n');
    }

    let mut times = String::from("timestep,time\n");
    for t in 0..288 {
        times.push_str(&format!("{t},{:02}:{:02}\n", t * 5 / 60, t * 5 % 60));
    }

    let bus_points: Vec<String> = BUSES
        .iter()
        .enumerate()
        .map(|(i, b)| point(-122.242 + i as f64 * 0.001, 37.817, &format!(r#""bus": "{b}""#)))
        .collect();

    let lines = feature_collection(&[format!(
        r#"{{"type": "Feature", "geometry": {{"type": "LineString", "coordinates": [[-122.242, 37.817], [-122.241, 37.817], [-122.240, 37.817]]}}, "properties": {{"name": "l1", "current": 0.3}}}}"#
    )]);

    let voronoi = feature_collection(
        &BUSES
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let x = -122.2425 + i as f64 * 0.001;
                format!(
                    r#"{{"type": "Feature", "geometry": {{"type": "Polygon", "coordinates": [[[{x}, 37.8165], [{}, 37.8165], [{}, 37.8175], [{x}, 37.8175], [{x}, 37.8165]]]}}, "properties": {{"bus": "{b}"}}}}"#,
                    x + 0.001,
                    x + 0.001
                )
            })
            .collect::<Vec<_>>(),
    );

    let contours = feature_collection(
        &(0..6)
            .map(|i| point(-122.242 + f64::from(i) * 0.0001, 37.817, &format!(r#""voltage": {}"#, 0.99 + f64::from(i) * 0.004)))
            .collect::<Vec<_>>(),
    );

    let icon = |lon: f64| feature_collection(&[point(lon, 37.818, r#""name": "site""#)]);

    vec![
        ("bus_voltages_all.csv", voltages),
        ("time_steps.csv", times),
        ("lines.geo.json", lines),
        ("buses.geo.json", feature_collection(&bus_points)),
        ("h3r10.json", r#"[{"h3": "8a283082a677fff", "voltage": 1.01}]"#.to_string()),
        ("s2r17.json", r#"[{"s2": "808f7c2b", "voltage": 0.99}]"#.to_string()),
        ("voronoi.geo.json", voronoi),
        ("contours.json", contours),
        ("evstations.geo.json", icon(-122.241)),
        ("pv.geo.json", icon(-122.240)),
        ("storage.geo.json", icon(-122.239)),
        ("tx.geo.json", icon(-122.238)),
    ]
}

/// Every EV-dashboard source as `(file name, contents)`.
pub fn ev_files() -> Vec<(&'static str, String)> {
    let mut loads = String::from("timestep,school_id,power\n");
    for t in 0..168 {
        for (i, id) in SITES.iter().enumerate() {
            loads.push_str(&format!("{t},{id},{:.1}\n", fixture_load(i, t)));
        }
    }

    let coords = |i: usize| (-76.9 + i as f64 * 0.02, 37.2 + i as f64 * 0.01);
    let site_points = feature_collection(
        &SITES
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let (x, y) = coords(i);
                point(x, y, &format!(r#""ID": {id}"#))
            })
            .collect::<Vec<_>>(),
    );
    let sites = format!(
        "[{}]",
        SITES
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let (x, y) = coords(i);
                format!(r#"{{"ID": {id}, "geometry": {{"type": "Point", "coordinates": [{x}, {y}]}}}}"#)
            })
            .collect::<Vec<_>>()
            .join(",")
    );

    vec![
        ("hourly_load_timesteps.csv", loads),
        ("schools.geo.json", site_points),
        ("schools.json", sites),
        ("schools_h3.json", r#"[{"h3r7": "872830828ffffff"}]"#.to_string()),
    ]
}

/// Writes `files` into `dir`.
pub fn write_files(dir: &Path, files: &[(&'static str, String)]) {
    for (name, body) in files {
        fs::write(dir.join(name), body).expect("fixture file should be writable");
    }
}

/// Voltage preset reading from fixtures written into `dir`.
pub fn local_voltage_config(dir: &Path) -> DashboardConfig {
    write_files(dir, &voltage_files());
    let mut cfg = DashboardConfig::voltage();
    cfg.data.relocate(dir);
    cfg
}

/// EV preset reading from fixtures written into `dir`.
pub fn local_ev_config(dir: &Path) -> DashboardConfig {
    write_files(dir, &ev_files());
    let mut cfg = DashboardConfig::ev();
    cfg.data.relocate(dir);
    cfg
}

/// Points every configured source at `<base>/<file name>`.
pub fn rebase_urls(data: &mut DataConfig, base: &str) {
    for slot in [
        &mut data.metrics,
        &mut data.times,
        &mut data.lines,
        &mut data.buses,
        &mut data.h3,
        &mut data.s2,
        &mut data.voronoi,
        &mut data.contours,
        &mut data.ev_stations,
        &mut data.pv,
        &mut data.storage,
        &mut data.transformers,
        &mut data.site_points,
        &mut data.sites,
        &mut data.site_cells,
    ] {
        if let Some(src) = slot.as_mut() {
            let name = src.rsplit('/').next().unwrap_or_default().to_string();
            *src = format!("{base}/{name}");
        }
    }
}
