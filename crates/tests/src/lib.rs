//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载到会话的契约测试
//! - 模拟 e2e 测试（无需 CARLA）：mock 模拟器 -> 传感器 -> Recorder -> 磁盘
//! - 近距离事件检测与日志

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    const CONFIG: &str = r#"
[recorder]
pre_event_seconds = 2.0
post_event_seconds = 1.0

[[lidars3d]]
label = "roof"
z = 2.4

[[cameras]]
label = "front"
x = 1.5
z = 1.2
width = 64
height = 48

[[cameras]]
label = "front"
x = -2.0
"#;

    #[test]
    fn test_loaded_config_feeds_buffer_settings() {
        let report = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();

        // duplicate label skipped, the rest usable
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.config.sensors.len(), 2);

        let clock: std::sync::Arc<dyn edr::Clock> = std::sync::Arc::new(edr::ManualClock::new(0.0));
        let session = edr::EdrSession::new(report.config.recorder.clone(), clock).unwrap();
        let settings = session.buffer_settings();
        assert_eq!(settings.pre_event_seconds, 2.0);
        assert_eq!(settings.post_event_seconds, 1.0);
    }

    #[test]
    fn test_config_survives_toml_export() {
        let report = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let exported = ConfigLoader::to_toml(&report.config).unwrap();

        let reloaded = ConfigLoader::load_from_str(&exported, ConfigFormat::Toml).unwrap();
        assert!(reloaded.is_complete(), "skipped: {:?}", reloaded.skipped);
        assert_eq!(reloaded.config.sensors.cameras[0].width, 64);
        assert_eq!(reloaded.config.sensors.lidars3d[0].placement.z, 2.4);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ActorState, RotationData, Vector3, VehicleKinematics, WorldSnapshot};
    use edr::{Clock, EdrSession, SystemClock, MANUAL_TRIGGER_REASON, REASON_FILE};
    use sensor_factory::{MockConfig, MockSimulator, SensorFactory};
    use tempfile::tempdir;

    const EGO_ID: u32 = 1;

    fn config(data_path: &Path) -> String {
        format!(
            r#"
[recorder]
pre_event_seconds = 0.5
post_event_seconds = 0.3
save_delay_seconds = 0.0
data_path = "{}"

[[lidars3d]]
label = "roof"
z = 2.4

[[cameras]]
label = "front"
width = 32
height = 24
rate = 20.0
"#,
            data_path.display()
        )
    }

    fn world(now: f64) -> WorldSnapshot {
        let ego = ActorState {
            id: EGO_ID,
            type_id: "vehicle.tesla.model3".into(),
            location: Vector3::new(5.0 * now, 0.0, 0.0),
            rotation: RotationData::default(),
            velocity: Vector3::new(5.0, 0.0, 0.0),
            extent: Vector3::new(2.4, 1.0, 0.8),
        };
        let car = ActorState {
            id: 2,
            type_id: "vehicle.audi.a2".into(),
            location: Vector3::new(5.0 * now + 15.0, 3.5, 0.0),
            rotation: RotationData::default(),
            velocity: Vector3::new(5.0, 0.0, 0.0),
            extent: Vector3::new(1.9, 0.9, 0.8),
        };
        WorldSnapshot {
            timestamp: now,
            ego: ego.clone(),
            kinematics: VehicleKinematics {
                local_velocity: Vector3::new(5.0, 0.0, 0.0),
                ..Default::default()
            },
            actors: vec![ego, car],
        }
    }

    fn files_with_ext(dir: &Path, ext: &str) -> usize {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|x| x == ext))
                    .count()
            })
            .unwrap_or(0)
    }

    /// 完整数据流：
    /// 1. 配置加载
    /// 2. mock 模拟器挂载相机和激光雷达，后台线程推送样本
    /// 3. 会话 tick 驱动车辆状态和感知传感器
    /// 4. 手动触发，等待事后窗口结束，写盘
    #[tokio::test]
    async fn test_e2e_mock_session_save() {
        let dir = tempdir().unwrap();
        let report = ConfigLoader::load_from_str(&config(dir.path()), ConfigFormat::Toml).unwrap();
        assert!(report.is_complete());

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mut session = EdrSession::new(report.config.recorder.clone(), Arc::clone(&clock)).unwrap();

        let factory = SensorFactory::new(MockSimulator::new(Arc::clone(&clock)));
        let attach = factory
            .attach_all(
                EGO_ID,
                &report.config.sensors,
                session.buffer_settings(),
                session.recorder(),
            )
            .await;
        assert!(attach.is_complete());
        assert_eq!(session.recorder().sensor_count(), 4);

        // fill the pre-event window
        for _ in 0..60 {
            session.tick(&world(clock.now()));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(session.trigger_manual());
        let mut ready = false;
        for _ in 0..200 {
            session.tick(&world(clock.now()));
            if session.is_event_ready() {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ready, "event never became ready");

        let saved = session.save().unwrap();
        let event_dir = &saved.path;
        assert!(event_dir.starts_with(dir.path()));
        assert_eq!(
            fs::read_to_string(event_dir.join(REASON_FILE)).unwrap(),
            MANUAL_TRIGGER_REASON
        );

        assert!(files_with_ext(&event_dir.join("images").join("front"), "png") > 0);
        assert!(files_with_ext(&event_dir.join("lidar3d").join("roof"), "ply") > 0);
        assert!(files_with_ext(&event_dir.join("perception").join("logs"), "json") > 0);

        let csv = fs::read_to_string(event_dir.join("vehicle-state").join("vehicle_state.csv")).unwrap();
        // header plus at least one row
        assert!(csv.lines().count() > 1);

        assert!(saved.samples_written > 0);
        assert!(!session.recorder().has_triggered());
        session.recorder().clear();
    }

    /// 单个传感器挂载失败不影响其余传感器
    #[tokio::test]
    async fn test_partial_attach_failure_still_records() {
        let dir = tempdir().unwrap();
        let report = ConfigLoader::load_from_str(&config(dir.path()), ConfigFormat::Toml).unwrap();

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let session = EdrSession::new(report.config.recorder.clone(), Arc::clone(&clock)).unwrap();

        let simulator = MockSimulator::with_config(
            MockConfig {
                fail_labels: vec!["roof".into()],
                ..Default::default()
            },
            Arc::clone(&clock),
        );
        let attach = SensorFactory::new(simulator)
            .attach_all(
                EGO_ID,
                &report.config.sensors,
                session.buffer_settings(),
                session.recorder(),
            )
            .await;

        assert!(!attach.is_complete());
        assert_eq!(attach.failures.len(), 1);
        assert_eq!(attach.failures[0].label, "roof");
        assert_eq!(attach.attached, vec!["front".to_string()]);
        // camera plus the built-in vehicle-state and perception sensors
        assert_eq!(session.recorder().sensor_count(), 3);
        session.recorder().clear();
    }
}

#[cfg(test)]
mod near_miss_tests {
    use std::fs;
    use std::sync::Arc;

    use contracts::{
        ActorState, NearMissSettings, RecorderSettings, RotationData, Vector3, VehicleKinematics,
        WorldSnapshot,
    };
    use edr::{Clock, EdrSession, ManualClock, NEAR_MISS_LOG_HEADER, NEAR_MISS_REASON, REASON_FILE};
    use tempfile::tempdir;

    fn snapshot(t: f64, pedestrian_x: f64) -> WorldSnapshot {
        let ego = ActorState {
            id: 1,
            type_id: "vehicle.lincoln.mkz_2020".into(),
            location: Vector3::new(0.0, 0.0, 0.0),
            rotation: RotationData::default(),
            velocity: Vector3::new(6.0, 0.0, 0.0),
            extent: Vector3::new(2.4, 1.0, 0.8),
        };
        let pedestrian = ActorState {
            id: 7,
            type_id: "walker.pedestrian.0011".into(),
            location: Vector3::new(pedestrian_x, 0.0, 0.0),
            rotation: RotationData::default(),
            velocity: Vector3::default(),
            extent: Vector3::new(0.3, 0.3, 0.9),
        };
        WorldSnapshot {
            timestamp: t,
            ego: ego.clone(),
            kinematics: VehicleKinematics::default(),
            actors: vec![ego, pedestrian],
        }
    }

    #[test]
    fn test_near_miss_logged_triggered_and_saved() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("near_miss.csv");
        let settings = RecorderSettings {
            pre_event_seconds: 0.5,
            post_event_seconds: 0.5,
            save_delay_seconds: 0.0,
            data_path: dir.path().join("events"),
            near_miss: NearMissSettings {
                log_file: Some(log_path.clone()),
                map_name: "Town10HD_Opt".into(),
                ..Default::default()
            },
            ..Default::default()
        };

        let clock = Arc::new(ManualClock::new(0.0));
        let shared: Arc<dyn Clock> = clock.clone();
        let mut session = EdrSession::new(settings, shared).unwrap();

        // far away: nothing happens
        let outcome = session.tick(&snapshot(0.0, 30.0));
        assert!(outcome.near_misses.is_empty());
        assert!(!session.recorder().has_triggered());

        // just ahead of the bumper
        clock.set(1.0);
        let outcome = session.tick(&snapshot(1.0, 3.0));
        assert_eq!(outcome.near_misses.len(), 1);
        assert_eq!(outcome.near_misses[0].vru_id, 7);
        assert_eq!(session.recorder().event().unwrap().reason, NEAR_MISS_REASON);

        let mut t = 1.0;
        while !session.is_event_ready() && t < 3.0 {
            t += 0.05;
            clock.set(t);
            session.tick(&snapshot(t, 30.0));
        }
        assert!(session.is_event_ready());

        let saved = session.save().unwrap();
        assert_eq!(
            fs::read_to_string(saved.path.join(REASON_FILE)).unwrap(),
            NEAR_MISS_REASON
        );

        let log = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines[0], "Town10HD");
        assert_eq!(lines[1], NEAR_MISS_LOG_HEADER);
        assert!(lines[2].starts_with("pedestrian, "));
        assert_eq!(lines.len(), 3);
    }
}
