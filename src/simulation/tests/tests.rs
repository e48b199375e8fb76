mod tests {
    mod netlist {
        extern crate simulation;
        use self::simulation::{
            circuit::{CircuitItem, Control, Directive, Source},
            netlist, schedule, Error, NetlistBuilder, StackConfig,
        };

        fn control_sources(config: &StackConfig) -> Vec<(String, Source)> {
            NetlistBuilder::new(config)
                .unwrap()
                .circuit()
                .items()
                .iter()
                .filter_map(|item| match item {
                    CircuitItem::V(reference, _, _, source @ Source::Pwl(_)) => {
                        Some((reference.clone(), source.clone()))
                    }
                    _ => None,
                })
                .collect()
        }

        fn exported(config: &StackConfig) -> Vec<String> {
            let circuit = NetlistBuilder::new(config).unwrap().circuit();
            circuit
                .controls()
                .iter()
                .find_map(|control| match control {
                    Control::WrData(file, vectors) => {
                        assert_eq!(netlist::MEASUREMENT_FILE, file);
                        Some(vectors.clone())
                    }
                    _ => None,
                })
                .unwrap()
        }

        #[test]
        fn deterministic() {
            let config = StackConfig::new(3, 2, 3, 10, 5.0, "10k");
            assert_eq!(
                netlist::build(&config).unwrap(),
                netlist::build(&config.clone()).unwrap()
            );
        }

        #[test]
        fn release_sources_2x2() {
            let config = StackConfig::new(2, 2, 1, 10, 5.0, "10k");
            let sources = control_sources(&config);
            assert_eq!(
                vec![
                    (
                        String::from("CTRL_L1_R1_C1"),
                        Source::Pwl(vec![(0, 0.0), (9, 0.0), (10, 5.0)])
                    ),
                    (
                        String::from("CTRL_L1_R1_C2"),
                        Source::Pwl(vec![(0, 0.0), (19, 0.0), (20, 5.0)])
                    ),
                    (
                        String::from("CTRL_L1_R2_C1"),
                        Source::Pwl(vec![(0, 0.0), (29, 0.0), (30, 5.0)])
                    ),
                    (
                        String::from("CTRL_L1_R2_C2"),
                        Source::Pwl(vec![(0, 0.0), (39, 0.0), (40, 5.0)])
                    ),
                ],
                sources
            );
            let text = netlist::build(&config).unwrap();
            assert!(text.contains("VCTRL_L1_R2_C2 CTRL_L1_R2_C2 0 PWL(0 0 39m 0 40m 5)\n"));
        }

        #[test]
        fn sources_follow_schedule() {
            let config = StackConfig::new(2, 3, 4, 7, 5.0, "10k");
            let sources = control_sources(&config);
            let releases = schedule::schedule(&config);
            assert_eq!(releases.len(), sources.len());
            for (release, (reference, source)) in releases.iter().zip(sources.iter()) {
                assert_eq!(&release.control_node(), reference);
                if let Source::Pwl(points) = source {
                    assert_eq!(Some(&(release.time_ms, 5.0)), points.last());
                    assert_eq!(release.time_ms - 1, points[points.len() - 2].0);
                } else {
                    panic!("control source is not a PWL source");
                }
            }
        }

        #[test]
        fn probe_count_independent_of_layers() {
            for layers in 1..=4 {
                let config = StackConfig::new(2, 3, layers, 10, 5.0, "10k");
                assert_eq!(24, exported(&config).len());
            }
        }

        #[test]
        fn export_order() {
            let config = StackConfig::new(2, 2, 2, 10, 5.0, "10k");
            let vectors = exported(&config);
            let expected: Vec<String> = [(1, 1), (1, 2), (2, 1), (2, 2)]
                .iter()
                .flat_map(|(r, c)| (1..=4).map(move |p| format!("V(MES_{}_{}_{})", r, c, p)))
                .collect();
            assert_eq!(expected, vectors);
        }

        #[test]
        fn single_bracket_stack() {
            let config = StackConfig::new(1, 1, 1, 10, 5.0, "10k");
            let circuit = NetlistBuilder::new(&config).unwrap().circuit();

            let columns: Vec<&CircuitItem> = circuit
                .items()
                .iter()
                .filter(|item| matches!(item, CircuitItem::X(_, _, name, _) if name == "COLUMN"))
                .collect();
            assert_eq!(1, columns.len());
            assert_eq!(1, control_sources(&config).len());
            assert_eq!(4, exported(&config).len());

            let column = circuit.get_subcircuit("COLUMN").unwrap();
            assert_eq!(
                vec!["vin", "gnd1", "gnd2", "gnd3", "gnd4", "ctrl1", "mes1", "mes2", "mes3", "mes4"],
                column.ports
            );
            let satellites: Vec<&CircuitItem> = column
                .circuit
                .items()
                .iter()
                .filter(|item| matches!(item, CircuitItem::X(..)))
                .collect();
            assert_eq!(1, satellites.len());
            if let CircuitItem::X(reference, nodes, _, _) = satellites[0] {
                assert_eq!("sat1", reference);
                assert_eq!(&["mes1", "mes2", "mes3", "mes4"], &nodes[0..4]);
                assert_eq!(&["end", "end", "end", "end"], &nodes[4..8]);
                assert_eq!("ctrl1", nodes[12]);
            }
        }

        #[test]
        fn satellite_chain() {
            let config = StackConfig::new(1, 1, 3, 10, 5.0, "10k");
            let circuit = NetlistBuilder::new(&config).unwrap().circuit();
            let column = circuit.get_subcircuit("COLUMN").unwrap();
            let chain: Vec<(Vec<String>, Vec<String>)> = column
                .circuit
                .items()
                .iter()
                .filter_map(|item| match item {
                    CircuitItem::X(_, nodes, _, _) => {
                        Some((nodes[0..4].to_vec(), nodes[4..8].to_vec()))
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(3, chain.len());
            assert_eq!(vec!["mes1", "mes2", "mes3", "mes4"], chain[0].0);
            for k in 1..3 {
                assert_eq!(chain[k - 1].1, chain[k].0);
            }
            assert_eq!(vec!["end", "end", "end", "end"], chain[2].1);
            let text = netlist::build(&config).unwrap();
            assert!(text.contains("Xsat2 sigin2_1 sigin2_2 sigin2_3 sigin2_4 sigin3_1 sigin3_2 sigin3_3 sigin3_4 gnd1 gnd2 gnd3 gnd4 ctrl2 SATELLITE RVAL={RVAL}\n"));
            assert!(text.contains("Rend end 0 1e12\n"));
        }

        #[test]
        fn device_definitions() {
            let config = StackConfig::new(1, 2, 2, 10, 3.3, "4.7k");
            let text = netlist::build(&config).unwrap();
            assert!(text.starts_with(".title "));
            assert!(text.contains(".model SW SW(Ron=1e12 Roff=0.01 Vt=2 Vh=0)\n"));
            assert!(text.contains(".subckt BRACKET sigin sigout gnd ctrl RVAL=4.7k\nSbr sigin sigout ctrl gnd SW\nRbr sigout gnd {RVAL}\n.ends BRACKET\n"));
            assert!(text.contains("Xb3 sigin3 sigout3 gnd3 ctrl BRACKET RVAL={RVAL}\n"));
            assert!(text.contains("V_SUP_1_2 C_1_2 0 3.3\n"));
            assert!(text.contains(
                "Xcol_1_2 C_1_2 0 0 0 0 CTRL_L1_R1_C2 CTRL_L2_R1_C2 MES_1_2_1 MES_1_2_2 MES_1_2_3 MES_1_2_4 COLUMN RVAL=4.7k\n"
            ));
            assert!(text.ends_with("quit\n.endc\n.end\n"));
        }

        #[test]
        fn tran_ends_after_last_release() {
            let config = StackConfig::new(2, 2, 3, 10, 5.0, "10k");
            let circuit = NetlistBuilder::new(&config).unwrap().circuit();
            let last = schedule::schedule(&config).last().unwrap().time_ms;
            assert_eq!(120, last);
            assert_eq!(
                &[Directive::Tran {
                    step: String::from("0.1m"),
                    stop: String::from("130m")
                }],
                circuit.directives()
            );
        }

        #[test]
        fn invalid_configuration() {
            for config in [
                StackConfig::new(0, 1, 1, 10, 5.0, "10k"),
                StackConfig::new(1, 1, 0, 10, 5.0, "10k"),
                StackConfig::new(1, 1, 1, 0, 5.0, "10k"),
                StackConfig::new(1, 1, 1, 10, -5.0, "10k"),
                StackConfig::new(1, 1, 1, 10, 5.0, "0"),
                StackConfig::new(1, 1, 1, 10, 5.0, " 10k"),
                StackConfig::new(1, 1, 1, u64::MAX / 2 + 1, 5.0, "10k"),
                StackConfig::new(2, 2, 2, u64::MAX / 8, 5.0, "10k"),
            ] {
                assert!(matches!(
                    netlist::build(&config),
                    Err(Error::InvalidConfiguration(_))
                ));
            }
        }
    }

    mod measurement {
        extern crate simulation;
        use self::simulation::{measurement, netlist, Error, StackConfig};

        /// Build a table the way `wrdata` writes it. Probe `p` of column
        /// `(r, c)` at step `t` has the value `r + c / 10 + p / 100 + t`.
        fn synthetic_table(config: &StackConfig, steps: usize) -> String {
            let mut lines = Vec::new();
            for t in 0..steps {
                let time = t as f64 * 1e-4;
                let mut values = vec![0.0; config.rows * config.cols * 4];
                for (row, col) in config.columns() {
                    for probe in 1..=4 {
                        values[netlist::probe_index(config, row, col, probe)] =
                            row as f64 + col as f64 / 10.0 + probe as f64 / 100.0 + t as f64;
                    }
                }
                let line: Vec<String> = values
                    .iter()
                    .map(|v| format!(" {:e}\t{:e}", time, v))
                    .collect();
                lines.push(line.join(" "));
            }
            lines.join("\n")
        }

        #[test]
        fn round_trip() {
            let config = StackConfig::new(2, 3, 2, 10, 5.0, "10k");
            let columns = measurement::decode(&synthetic_table(&config, 5), &config).unwrap();
            assert_eq!(6, columns.len());
            for column in &columns {
                assert_eq!(5, column.data.len());
                for (t, sample) in column.data.iter().enumerate() {
                    let expected = column.row as f64 + column.col as f64 / 10.0 + 0.025 + t as f64;
                    assert!((sample.voltage - expected).abs() < 1e-9);
                    assert!((sample.time_ms - t as f64 * 0.1).abs() < 1e-9);
                }
            }
        }

        #[test]
        fn labels_3x3() {
            let config = StackConfig::square(3, 1, 10, 5.0, "10k");
            let columns = measurement::decode(&synthetic_table(&config, 1), &config).unwrap();
            assert_eq!(9, columns.len());
            let fifth = &columns[4];
            assert_eq!("col-5", fifth.column_id);
            assert_eq!("2-2", fifth.column_label);
            assert_eq!((2, 2), (fifth.row, fifth.col));
        }

        #[test]
        fn fewer_probes_than_columns() {
            let config = StackConfig::new(2, 2, 1, 10, 5.0, "10k");
            let small = StackConfig::new(1, 2, 1, 10, 5.0, "10k");
            let err = measurement::decode(&synthetic_table(&small, 3), &config).unwrap_err();
            assert_eq!(
                Error::ConfigMismatch {
                    expected: 16,
                    actual: 8
                },
                err
            );
        }

        #[test]
        fn malformed_line() {
            let config = StackConfig::new(1, 1, 1, 10, 5.0, "10k");
            let mut table = synthetic_table(&config, 3);
            table.push_str("\n 3e-4 1.0 3e-4");
            match measurement::decode(&table, &config) {
                Err(Error::MeasurementParseError { line, content, .. }) => {
                    assert_eq!(4, line);
                    assert_eq!(" 3e-4 1.0 3e-4", content);
                }
                other => panic!("expected a parse error, got {:?}", other),
            }
        }

        #[test]
        fn missing_file() {
            let config = StackConfig::new(1, 1, 1, 10, 5.0, "10k");
            let dir = tempfile::tempdir().unwrap();
            let err = measurement::decode_file(dir.path().join("missing.dat"), &config).unwrap_err();
            assert!(matches!(err, Error::MeasurementFileNotFound(_, _)));
        }

        #[test]
        fn decode_file() {
            let config = StackConfig::new(1, 2, 1, 10, 5.0, "10k");
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(netlist::MEASUREMENT_FILE);
            std::fs::write(&path, synthetic_table(&config, 4)).unwrap();
            let columns = measurement::decode_file(&path, &config).unwrap();
            assert_eq!(2, columns.len());
            assert_eq!(4, columns[1].data.len());
        }
    }

    mod simulation {
        extern crate simulation;
        use self::simulation::{
            netlist, Error, Simulation, SimulatorOutput, Simulator, StackConfig,
        };
        use std::fs;

        /// Writes a constant table instead of running ngspice.
        struct FakeSimulator {
            steps: usize,
            netlists: Vec<String>,
        }

        impl Simulator for FakeSimulator {
            fn run(&mut self, netlist: &str) -> Result<SimulatorOutput, Error> {
                self.netlists.push(netlist.to_string());
                let vectors = netlist
                    .lines()
                    .find(|line| line.starts_with("wrdata"))
                    .map(|line| line.split_whitespace().count() - 2)
                    .unwrap_or(0);
                let dir = tempfile::tempdir()?;
                let path = dir.path().join(netlist::MEASUREMENT_FILE);
                let mut table = String::new();
                for t in 0..self.steps {
                    for probe in 0..vectors {
                        table.push_str(&format!(" {:e} {:e}", t as f64 * 1e-3, probe as f64));
                    }
                    table.push('\n');
                }
                fs::write(&path, table)?;
                Ok(SimulatorOutput::new(vec![String::from("stdout done")], path).with_workdir(dir))
            }
        }

        struct FailingSimulator;

        impl Simulator for FailingSimulator {
            fn run(&mut self, _netlist: &str) -> Result<SimulatorOutput, Error> {
                Err(Error::SimulatorFailure(String::from("timestep too small")))
            }
        }

        struct SilentSimulator;

        impl Simulator for SilentSimulator {
            fn run(&mut self, _netlist: &str) -> Result<SimulatorOutput, Error> {
                Ok(SimulatorOutput::new(
                    Vec::new(),
                    std::path::PathBuf::from("/nonexistent/mes_voltages.dat"),
                ))
            }
        }

        #[test]
        fn run_pipeline() {
            let config = StackConfig::new(2, 2, 2, 10, 5.0, "10k");
            let simulation = Simulation::new(config.clone()).unwrap();
            let mut simulator = FakeSimulator {
                steps: 3,
                netlists: Vec::new(),
            };
            let results = simulation.run(&mut simulator).unwrap();

            assert_eq!(vec![netlist::build(&config).unwrap()], simulator.netlists);
            assert_eq!(config, results.config);
            assert_eq!(8, results.satellites.len());
            assert_eq!(4, results.measurements.len());
            assert_eq!(Some(String::from("stdout done")), results.raw_output);
            // probe k holds the value k, column n averages 4n-4 .. 4n-1
            for (n, column) in results.measurements.iter().enumerate() {
                assert_eq!(3, column.data.len());
                assert_eq!(4.0 * n as f64 + 1.5, column.data[0].voltage);
                assert!((column.data[2].time_ms - 2.0).abs() < 1e-9);
            }
        }

        #[test]
        fn simulator_failure() {
            let simulation = Simulation::new(StackConfig::default()).unwrap();
            assert_eq!(
                Err(Error::SimulatorFailure(String::from("timestep too small"))),
                simulation.run(&mut FailingSimulator)
            );
        }

        #[test]
        fn missing_output() {
            let simulation = Simulation::new(StackConfig::default()).unwrap();
            assert!(matches!(
                simulation.run(&mut SilentSimulator),
                Err(Error::MeasurementFileNotFound(_, _))
            ));
        }

        #[test]
        fn invalid_configuration() {
            assert!(matches!(
                Simulation::new(StackConfig::new(1, 1, 1, 0, 5.0, "10k")),
                Err(Error::InvalidConfiguration(_))
            ));
        }

        #[test]
        #[ignore] // Requires ngspice to be installed
        fn ngspice() {
            use self::simulation::NgSpiceSimulator;
            let config = StackConfig::new(2, 2, 2, 10, 5.0, "10k");
            let simulation = Simulation::new(config).unwrap();
            let results = simulation.run(&mut NgSpiceSimulator::default()).unwrap();
            assert_eq!(4, results.measurements.len());
            assert!(!results.measurements[0].data.is_empty());
        }
    }
}
