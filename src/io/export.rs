//! CSV export for hourly trial trajectories.

use std::io::{self, Write};

use crate::sim::integrator::Trajectory;

/// Column header for trajectory CSV export.
const HEADER: &str = "time_h,exterior_c,wall_c,air_c,server_c,case_c,\
                      cooling_power_w,cop,electrical_power_w,energy_kwh";

/// Writes one trajectory as CSV to any writer.
///
/// One header row followed by one row per hourly sample. Output is
/// deterministic for identical inputs.
///
/// # Arguments
///
/// * `trajectory` - Hourly samples of a single trial
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trajectory_csv(trajectory: &Trajectory, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for i in 0..trajectory.len() {
        wtr.write_record(&[
            format!("{:.2}", trajectory.time_h[i]),
            format!("{:.3}", trajectory.exterior_c[i]),
            format!("{:.3}", trajectory.wall_c[i]),
            format!("{:.3}", trajectory.air_c[i]),
            format!("{:.3}", trajectory.server_c[i]),
            format!("{:.3}", trajectory.case_c[i]),
            format!("{:.1}", trajectory.cooling_power_w[i]),
            format!("{:.4}", trajectory.cop[i]),
            format!("{:.1}", trajectory.electrical_power_w[i]),
            format!("{:.4}", trajectory.energy_kwh[i]),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trajectory(n: usize) -> Trajectory {
        let mut t = Trajectory::with_capacity(n);
        for i in 0..n {
            t.time_h.push(i as f64);
            t.exterior_c.push(30.0 + i as f64);
            t.wall_c.push(26.0);
            t.air_c.push(18.5);
            t.server_c.push(28.5);
            t.case_c.push(21.25);
            t.cooling_power_w.push(27_500.0);
            t.cop.push(3.2);
            t.electrical_power_w.push(27_500.0 / 3.2);
            t.energy_kwh.push(8.59375 * i as f64);
        }
        t
    }

    #[test]
    fn header_lists_every_channel() {
        let mut buf = Vec::new();
        write_trajectory_csv(&make_trajectory(1), &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let first_line = output.as_deref().unwrap_or("").lines().next().unwrap_or("");
        assert_eq!(
            first_line,
            "time_h,exterior_c,wall_c,air_c,server_c,case_c,\
             cooling_power_w,cop,electrical_power_w,energy_kwh"
        );
    }

    #[test]
    fn row_count_matches_samples() {
        let mut buf = Vec::new();
        write_trajectory_csv(&make_trajectory(25), &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let lines: Vec<&str> = output.as_deref().unwrap_or("").lines().collect();
        // 1 header + 25 samples
        assert_eq!(lines.len(), 26);
    }

    #[test]
    fn empty_trajectory_writes_header_only() {
        let mut buf = Vec::new();
        write_trajectory_csv(&Trajectory::default(), &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn rows_parse_back_as_numbers() {
        let mut buf = Vec::new();
        write_trajectory_csv(&make_trajectory(3), &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(10));

        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.expect("every row should parse");
            for i in 0..10 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            rows += 1;
        }
        assert_eq!(rows, 3);
    }
}
