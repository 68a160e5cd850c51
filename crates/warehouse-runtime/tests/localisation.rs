//! End-to-end localisation runs against simulated robots.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use warehouse_hal::{RobotLink, SharedFloor, SimRobot};
use warehouse_perception::{MapService, PhysicalRangeConverter, WarehouseMap};
use warehouse_runtime::{
    CandidateProjection, FleetLocaliser, LocalisationError, Localiser, LocaliserConfig, ProgressObserver,
    localise_robot,
};
use warehouse_types::{Direction, GridPoint, RobotLocation};

fn config() -> LocaliserConfig {
    LocaliserConfig {
        seed: Some(42),
        ..LocaliserConfig::default()
    }
}

#[derive(Default)]
struct Recorder {
    counts: Mutex<Vec<[usize; 4]>>,
}

impl ProgressObserver for Recorder {
    fn on_progress(&self, projections: &[CandidateProjection<'_>; 4]) {
        let counts = [0, 1, 2, 3].map(|i| projections[i].len());
        self.counts.lock().unwrap().push(counts);
    }
}

#[test]
fn open_square_room_keeps_every_hypothesis_alive() {
    let map = WarehouseMap::new(2, 2);
    let mut robot = SimRobot::new("square", map.clone(), GridPoint::new(0, 0), Direction::Up);
    let recorder = Recorder::default();

    let mut localiser = Localiser::new(&map, &config()).with_observer(&recorder);
    let err = localiser.localise(&mut robot).unwrap_err();

    // Every corner of a square room reads the same, so the run can only
    // end at the cap, with each hypothesis still holding one corner.
    assert!(matches!(err, LocalisationError::Impossible { .. }));
    assert_eq!(robot.moves(), 100);
    let counts = recorder.counts.lock().unwrap();
    assert_eq!(counts.len(), 100);
    assert_eq!(counts[0], [1, 1, 1, 1]);
}

#[test]
fn default_warehouse_start_poses_converge_to_ground_truth() {
    let map = WarehouseMap::default_warehouse();
    let cases = [
        (GridPoint::new(0, 0), RobotLocation::new(GridPoint::new(0, 2), Direction::Up)),
        (GridPoint::new(11, 7), RobotLocation::new(GridPoint::new(9, 7), Direction::Left)),
        (GridPoint::new(0, 7), RobotLocation::new(GridPoint::new(0, 5), Direction::Down)),
    ];
    for (start, expected) in cases {
        let mut robot = SimRobot::new("r", map.clone(), start, Direction::Left);
        let mut localiser = Localiser::new(&map, &config());
        let pose = localiser.localise(&mut robot).unwrap();
        assert_eq!(pose, robot.pose(), "start {start}");
        assert_eq!(pose, expected, "start {start}");
        assert_eq!(localiser.iterations(), 2);
    }
}

#[test]
fn physical_readings_localise_the_same_way() {
    let map = WarehouseMap::default_warehouse();
    let mut robot = SimRobot::new("phys", map.clone(), GridPoint::new(0, 0), Direction::Left)
        .with_converter(Box::new(PhysicalRangeConverter::default()), 30.0)
        .with_waits_per_move(2);
    let pose = Localiser::new(&map, &config()).localise(&mut robot).unwrap();
    assert_eq!(pose, robot.pose());
}

#[test]
fn enclosed_robot_fails_without_moving() {
    let map = WarehouseMap::default_warehouse();
    // Two parked robots box the corner in.
    let mut world = map.clone();
    world.mark_occupied_around(GridPoint::new(0, 1));
    world.mark_occupied_around(GridPoint::new(1, 0));
    let mut robot = SimRobot::new("boxed", world, GridPoint::new(0, 0), Direction::Up);

    let err = Localiser::new(&map, &config()).localise(&mut robot).unwrap_err();
    match err {
        LocalisationError::Impossible { signature } => {
            assert!(signature.available_directions().is_empty());
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(robot.moves(), 0);
}

#[test]
fn fleet_localises_each_robot_and_blocks_its_cell() {
    let map = WarehouseMap::default_warehouse();
    let mut robots: Vec<SimRobot> = [
        ("alpha", GridPoint::new(0, 0)),
        ("bravo", GridPoint::new(11, 7)),
        ("charlie", GridPoint::new(0, 7)),
    ]
    .into_iter()
    .map(|(name, start)| SimRobot::new(name, map.clone(), start, Direction::Left))
    .collect();

    let mut fleet = FleetLocaliser::new(map, config());
    let report = fleet.localise_all(&mut robots, &AtomicBool::new(false));

    assert!(report.is_complete(), "failed: {:?}", report.failed);
    assert_eq!(report.located.len(), 3);
    for (located, robot) in report.located.iter().zip(&robots) {
        assert_eq!(located.name, robot.name());
        assert_eq!(located.location, robot.pose());
        assert!(fleet.map().blocked_points().contains(&robot.position()));
    }
}

#[test]
fn fleet_on_a_shared_floor_parks_robots_next_to_each_other() {
    let map = WarehouseMap::default_warehouse();
    let floor: SharedFloor = Arc::new(RwLock::new(map.clone()));
    let mut robots = vec![
        SimRobot::on_floor("alpha", floor.clone(), GridPoint::new(0, 0), Direction::Left),
        SimRobot::on_floor("bravo", floor.clone(), GridPoint::new(0, 4), Direction::Down),
    ];

    let mut fleet = FleetLocaliser::new(map, config());
    let report = fleet.localise_all(&mut robots, &AtomicBool::new(false));

    assert!(report.is_complete(), "failed: {:?}", report.failed);
    assert_eq!(
        report.located[0].location,
        RobotLocation::new(GridPoint::new(0, 2), Direction::Up)
    );
    // Bravo drives south until it reads alpha straight ahead.
    assert_eq!(
        report.located[1].location,
        RobotLocation::new(GridPoint::new(0, 3), Direction::Down)
    );
    assert_eq!(report.located[1].moves, 1);
    for robot in &robots {
        assert_eq!(
            report.located.iter().find(|r| r.name == robot.name()).map(|r| r.location),
            Some(robot.pose())
        );
    }

    let floor = floor.read().unwrap();
    assert!(floor.blocked_points().contains(&GridPoint::new(0, 2)));
    assert!(floor.blocked_points().contains(&GridPoint::new(0, 3)));
}

#[test]
fn localise_robot_respects_already_localised_robots() {
    let mut map = WarehouseMap::default_warehouse();
    let parked = [
        RobotLocation::new(GridPoint::new(0, 2), Direction::Up),
        RobotLocation::new(GridPoint::new(9, 7), Direction::Left),
    ];
    let mut robot = SimRobot::new("charlie", map.clone(), GridPoint::new(0, 7), Direction::Left);

    let pose = localise_robot(&mut robot, &mut map, &parked, &config(), &[]).unwrap();
    assert_eq!(pose, robot.pose());
    assert!(map.blocked_points().contains(&GridPoint::new(9, 7)));
}
