use om_results::parse_artifact;
use proptest::prelude::*;

fn csv_text(names: &[String], rows: &[Vec<f64>], dt: f64) -> String {
    let mut out = String::from("\"time\"");
    for name in names {
        out.push_str(&format!(",\"{}\"", name));
    }
    out.push('\n');
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("{}", i as f64 * dt));
        for v in row {
            out.push_str(&format!(",{}", v));
        }
        out.push('\n');
    }
    out
}

proptest! {
    #[test]
    fn every_series_matches_time_length(
        n_vars in 1usize..6,
        n_rows in 1usize..60,
        dt in 0.001f64..1.0,
        seed in -1.0e6f64..1.0e6,
    ) {
        let names: Vec<String> = (0..n_vars).map(|i| format!("v{}", i)).collect();
        let rows: Vec<Vec<f64>> = (0..n_rows)
            .map(|r| (0..n_vars).map(|c| seed + (r * n_vars + c) as f64).collect())
            .collect();

        let artifact = parse_artifact(&csv_text(&names, &rows, dt)).unwrap();

        prop_assert_eq!(artifact.sample_count(), n_rows);
        prop_assert_eq!(artifact.variables().len(), n_vars);
        for name in &names {
            prop_assert_eq!(artifact.series(name).unwrap().len(), artifact.time().len());
        }
    }
}
