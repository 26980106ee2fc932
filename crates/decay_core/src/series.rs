//! Aligns every nuclide's series onto the shared sample-time axis.

use crate::error::{DecayError, Result};
use crate::network::DecayRun;
use crate::units::TimeUnit;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// One time column plus one population column per nuclide, rows in time order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    pub time_unit: TimeUnit,
    pub times: Vec<f64>,
    pub columns: Vec<SeriesColumn>,
}

impl SeriesTable {
    /// Builds the table from a finished run.
    ///
    /// Every series must hold exactly `total_steps + 1` samples; the first
    /// nuclide that does not is reported and no table is produced.
    pub fn compile(run: &DecayRun, time_unit: TimeUnit) -> Result<Self> {
        let expected = run.total_steps() + 1;
        for nuclide in run.nuclides() {
            let found = nuclide.series().len();
            if found != expected {
                return Err(DecayError::Misaligned {
                    nuclide: nuclide.name().to_string(),
                    expected,
                    found,
                });
            }
        }

        let times = run
            .sample_times()
            .into_iter()
            .map(|seconds| time_unit.from_seconds(seconds))
            .collect();
        let columns = run
            .nuclides()
            .iter()
            .map(|nuclide| SeriesColumn {
                name: nuclide.name().to_string(),
                values: nuclide.series().to_vec(),
            })
            .collect();

        Ok(Self {
            time_unit,
            times,
            columns,
        })
    }

    pub fn time_header(&self) -> String {
        format!("time ({})", self.time_unit)
    }

    /// `time (<unit>)` followed by the nuclide names.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.time_header())
            .chain(self.columns.iter().map(|column| column.name.clone()))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.times.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.values.as_slice())
    }

    /// Row `idx` as `[time, value_1, value_2, ...]`.
    pub fn row(&self, idx: usize) -> Option<Vec<f64>> {
        let time = *self.times.get(idx)?;
        let mut row = Vec::with_capacity(self.columns.len() + 1);
        row.push(time);
        row.extend(self.columns.iter().map(|column| column.values[idx]));
        Some(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.row_count()).filter_map(move |idx| self.row(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::DecayNetwork;
    use crate::nuclide::NuclideSpec;
    use approx::assert_relative_eq;

    fn chain_run(dt: f64, duration: f64) -> DecayRun {
        let specs = [
            NuclideSpec::new("A", 1.2, TimeUnit::Minutes).with_production(20000.0, TimeUnit::Minutes),
            NuclideSpec::new("B", 2.0, TimeUnit::Minutes).with_parents(["A"]),
        ];
        DecayNetwork::with_specs(dt, duration, &specs).unwrap().run()
    }

    #[test]
    fn compiles_aligned_table_in_display_unit() {
        let run = chain_run(6.0, 60.0);
        let table = run.compile(TimeUnit::Minutes).unwrap();
        assert_eq!(table.row_count(), 11);
        assert_eq!(table.header(), vec!["time (minutes)", "A", "B"]);
        assert_relative_eq!(table.times[10], 1.0);
        assert_relative_eq!(table.times[5], 0.5);
        assert_eq!(table.column("B").unwrap(), run.nuclide("B").unwrap().series());
        assert!(table.column("C").is_none());
    }

    #[test]
    fn rows_follow_time_order() {
        let table = chain_run(1.0, 3.0).compile(TimeUnit::Seconds).unwrap();
        let rows: Vec<Vec<f64>> = table.rows().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec![0.0, 0.0, 0.0]);
        for (idx, row) in rows.iter().enumerate() {
            assert_eq!(row[0], idx as f64);
            assert_eq!(row.len(), 3);
        }
        assert!(table.row(4).is_none());
    }

    #[test]
    fn truncated_series_is_reported_as_misaligned() {
        let mut run = chain_run(1.0, 10.0);
        run.nuclides[1].series.pop();
        let err = SeriesTable::compile(&run, TimeUnit::Seconds).unwrap_err();
        match err {
            DecayError::Misaligned {
                nuclide,
                expected,
                found,
            } => {
                assert_eq!(nuclide, "B");
                assert_eq!(expected, 11);
                assert_eq!(found, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extended_series_is_reported_as_misaligned() {
        let mut run = chain_run(1.0, 10.0);
        run.nuclides[0].series.push(0.0);
        assert!(matches!(
            run.compile(TimeUnit::Seconds),
            Err(DecayError::Misaligned { ref nuclide, .. }) if nuclide == "A"
        ));
    }
}
