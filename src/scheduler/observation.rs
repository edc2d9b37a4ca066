//! Tick-by-tick target selection and telescope slewing.

use std::sync::mpsc;

use chrono::{DateTime, Utc};

use crate::abort::AbortSignal;
use crate::pointing::{
    clamp_signed, normalize_azimuth, normalize_elevation, shortest_azimuth_delta, PointingState,
};
use crate::predict::{EphemerisProvider, PriorityTable};
use crate::scheduler::candidates::{Candidate, CandidateSetBuilder};
use crate::scheduler::error::SchedulerError;
use crate::scheduler::history::RecentHistory;
use crate::scheduler::record::{ActionRecord, Mode, NO_TARGET_PRIORITY};
use crate::scheduler::settings::SchedulerSettings;

/// Dwell value set when the first target is picked; the first observing tick brings it to 0.
const INITIAL_DWELL: i64 = -1;

#[derive(Debug, Clone)]
pub struct SchedulerState {
    pub station_pointing: PointingState,
    pub current_target: Option<Candidate>,
    pub dwell_ticks: i64,
    pub mode: Mode,
    pub recent_history: RecentHistory,
}

pub struct ObservationScheduler {
    settings: SchedulerSettings,
    candidates: CandidateSetBuilder,
    state: SchedulerState,
}

impl ObservationScheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        let state = SchedulerState {
            station_pointing: settings.initial_pointing,
            current_target: None,
            dwell_ticks: 0,
            mode: Mode::Turning,
            recent_history: RecentHistory::new(settings.skip_known),
        };
        let candidates = CandidateSetBuilder {
            elevation_cutoff_deg: settings.elevation_cutoff_deg,
            sort: settings.sort_column,
        };
        Self {
            settings,
            candidates,
            state,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Runs every tick of the configured duration.
    ///
    /// `abort_rx` is polled once per tick; a signal stops the run and the records emitted
    /// so far are returned.
    pub fn run<E: EphemerisProvider + ?Sized>(
        &mut self,
        ephemeris: &E,
        priorities: &PriorityTable,
        abort_rx: Option<&mpsc::Receiver<AbortSignal>>,
    ) -> Result<Vec<ActionRecord>, SchedulerError> {
        let end_time = self.settings.end_time()?;
        log::info!(
            "Scheduling {} ticks for {} from {} to {}",
            self.settings.duration_ticks,
            self.settings.station_name,
            self.settings.start_time,
            end_time
        );

        let mut records = Vec::with_capacity(self.settings.duration_ticks as usize);
        for tick_index in 0..self.settings.duration_ticks {
            if let Some(signal) = abort_rx.and_then(|rx| rx.try_recv().ok()) {
                log::warn!("Run aborted at tick {}: {}", tick_index, signal.reason);
                break;
            }

            let timestamp = self.settings.tick_time(tick_index)?;
            let candidates = self.candidates.build(
                ephemeris,
                timestamp,
                priorities,
                &self.state.station_pointing,
            )?;
            records.push(self.advance(timestamp, tick_index, &candidates)?);
        }

        log::info!(
            "Scheduling finished after {} ticks, {} targets in recent history",
            records.len(),
            self.state.recent_history.len()
        );
        Ok(records)
    }

    /// Applies one tick worth of decisions to the state and reports what happened.
    pub fn advance(
        &mut self,
        timestamp: DateTime<Utc>,
        tick_index: u32,
        candidates: &[Candidate],
    ) -> Result<ActionRecord, SchedulerError> {
        if candidates.is_empty() {
            return Err(SchedulerError::EmptyCandidateSet {
                timestamp,
                tick_index,
            });
        }

        let mut comments = Vec::new();
        let initial = self.state.current_target.is_none();
        let target = self.select_target(candidates, &mut comments);
        self.slew_towards(&target.pointing, &mut comments);

        let state = &mut self.state;
        let mut record = ActionRecord {
            timestamp,
            mode: state.mode,
            azimuth_deg: state.station_pointing.azimuth_deg(),
            elevation_deg: state.station_pointing.elevation_deg(),
            target_name: None,
            dwell_ticks: 0,
            tick_index,
            comments,
            priority: NO_TARGET_PRIORITY,
            target_norad_id: None,
            target_cospar_id: None,
        };

        match state.mode {
            Mode::Observing => {
                state.dwell_ticks += 1;
                state.recent_history.add(target.id);
                record.target_name = Some(target.name.clone());
                record.priority = target.priority;
                record.target_norad_id = Some(target.id);
                record.target_cospar_id = Some(target.cospar_id.clone());
            }
            // the sentinel survives the tick it was set on
            Mode::Turning if initial => {}
            Mode::Turning => state.dwell_ticks = 0,
        }
        record.dwell_ticks = state.dwell_ticks;

        log::debug!(
            "tick {} {} {} dwell={} [{}]",
            tick_index,
            record.mode,
            target.name,
            record.dwell_ticks,
            record.joined_comments()
        );

        state.current_target = Some(target);
        Ok(record)
    }

    fn select_target(&mut self, candidates: &[Candidate], comments: &mut Vec<String>) -> Candidate {
        let state = &mut self.state;
        let no_other = candidates.len() == 1;

        let Some((current_id, current_name)) = state
            .current_target
            .as_ref()
            .map(|c| (c.id, c.name.clone()))
        else {
            let first = candidates[0].clone();
            state.dwell_ticks = INITIAL_DWELL;
            state.mode = Mode::Turning;
            comments.push(format!("INITIAL::{}", first.name));
            return first;
        };

        let Some(current) = candidates.iter().find(|c| c.id == current_id) else {
            state.mode = Mode::Turning;
            let replacement = candidates
                .iter()
                .find(|c| no_other || !state.recent_history.contains(c.id))
                .unwrap_or(&candidates[0])
                .clone();
            if replacement.id != current_id {
                state.dwell_ticks = 0;
            } else {
                state.mode = Mode::Observing;
            }
            comments.push(format!("NOT_AVAILABLE::{}", current_name));
            comments.push(format!("SWITCH::{}", replacement.name));
            return replacement;
        };

        if no_other {
            state.mode = Mode::Observing;
            comments.push(format!("NO_OTHER_SAT::{}", current.name));
            return current.clone();
        }

        if state.dwell_ticks >= self.settings.min_dwell_ticks {
            let next = candidates
                .iter()
                .find(|c| c.id != current_id && !state.recent_history.contains(c.id));
            if let Some(next) = next {
                state.recent_history.add(current_id);
                state.dwell_ticks = 0;
                state.mode = Mode::Turning;
                comments.push(format!("TIME_FOR_NEW::{}", next.name));
                return next.clone();
            }
        }

        state.mode = Mode::Observing;
        current.clone()
    }

    /// Moves the station towards `target`, at most one slew step per axis.
    fn slew_towards(&mut self, target: &PointingState, comments: &mut Vec<String>) {
        let limit = self.settings.slew_limit_rad();
        let station = self.state.station_pointing;
        let delta = *target - station;

        let delta_az = shortest_azimuth_delta(delta.azimuth);
        let delta_el = delta.elevation;
        if delta_az.abs() > limit {
            comments.push("BIG_AZ".to_string());
        }
        if delta_el.abs() > limit {
            comments.push("BIG_EL".to_string());
        }

        let step_az = clamp_signed(delta_az, limit);
        let step_el = clamp_signed(delta_el, limit);
        if step_az.abs() >= limit || step_el.abs() >= limit {
            self.state.mode = Mode::Turning;
            comments.push("FAR_AWAY".to_string());
        }

        self.state.station_pointing = PointingState::new(
            normalize_azimuth(station.azimuth + step_az),
            normalize_elevation(station.elevation + step_el),
            target.distance,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::predict::{ObjectPosition, PredictError, PriorityEntry};
    use crate::scheduler::candidates::SortColumn;
    use crate::scheduler::settings::MIN_DWELL;
    use chrono::{Duration, TimeZone};
    use std::f64::consts::TAU;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 28, 0, 0, 0).unwrap()
    }

    fn settings(skip_known: usize, ticks: u32) -> SchedulerSettings {
        let mut s = SchedulerSettings::new("Greenbelt", start());
        s.skip_known = skip_known;
        s.duration_ticks = ticks;
        s.sort_column = SortColumn::Priority;
        s
    }

    fn candidate(id: u32, name: &str, priority: i64, az_deg: f64, el_deg: f64) -> Candidate {
        Candidate {
            id,
            name: name.to_string(),
            priority,
            cospar_id: format!("C{id}"),
            pointing: PointingState::from_degrees(az_deg, el_deg, 700_000.0),
            chord_to_station: 0.0,
        }
    }

    /// Objects fixed in the sky, optionally visible only for a range of ticks.
    struct StaticSky {
        objects: Vec<(ObjectPosition, std::ops::Range<u32>)>,
    }

    impl EphemerisProvider for StaticSky {
        fn positions_at(&self, time: DateTime<Utc>) -> Result<Vec<ObjectPosition>, PredictError> {
            let tick = ((time - start()).num_minutes()) as u32;
            Ok(self
                .objects
                .iter()
                .filter(|(_, visible)| visible.contains(&tick))
                .map(|(p, _)| p.clone())
                .collect())
        }
    }

    fn object(id: u32, az_deg: f64, el_deg: f64) -> ObjectPosition {
        ObjectPosition {
            norad_id: id,
            name: format!("OBJ {id}"),
            azimuth_rad: az_deg.to_radians(),
            elevation_rad: el_deg.to_radians(),
            distance_m: 800_000.0,
        }
    }

    fn entry(id: u32, priority: i64, name: &str) -> PriorityEntry {
        PriorityEntry {
            priority,
            name: name.to_string(),
            norad_id: id,
            cospar_id: format!("C{id}"),
        }
    }

    fn priorities(entries: &[(u32, i64, &str)]) -> PriorityTable {
        entries
            .iter()
            .map(|&(id, priority, name)| entry(id, priority, name))
            .collect()
    }

    fn angular_step(from: f64, to: f64) -> f64 {
        let d = (to - from).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn empty_candidate_set_is_fatal() {
        let mut scheduler = ObservationScheduler::new(settings(0, 10));
        let err = scheduler.advance(start(), 3, &[]).unwrap_err();
        match err {
            SchedulerError::EmptyCandidateSet {
                timestamp,
                tick_index,
            } => {
                assert_eq!(timestamp, start());
                assert_eq!(tick_index, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn run_aborts_when_sky_goes_empty() {
        let sky = StaticSky {
            objects: vec![(object(1, 30.0, 40.0), 0..5)],
        };
        let mut scheduler = ObservationScheduler::new(settings(0, 20));
        let err = scheduler
            .run(&sky, &priorities(&[(1, 1, "A")]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::EmptyCandidateSet { tick_index: 5, timestamp } if timestamp == start() + Duration::minutes(5)
        ));
    }

    #[test]
    fn single_target_is_observed_throughout() {
        let sky = StaticSky {
            objects: vec![(object(1, 30.0, 40.0), 0..100)],
        };
        let mut scheduler = ObservationScheduler::new(settings(2, 40));
        let records = scheduler
            .run(&sky, &priorities(&[(1, 1, "A")]), None)
            .unwrap();

        assert_eq!(records.len(), 40);
        assert!(records[0].has_comment("INITIAL::A"));
        assert_eq!(records[0].mode, Mode::Turning);
        assert_eq!(records[0].dwell_ticks, -1);

        for (i, record) in records.iter().enumerate().skip(1) {
            assert_eq!(record.mode, Mode::Observing, "tick {i}");
            assert_eq!(record.target_name.as_deref(), Some("A"));
            assert!(record.has_comment("NO_OTHER_SAT::A"));
            assert_eq!(record.dwell_ticks, i as i64 - 1);
        }
    }

    #[test]
    fn switch_comes_on_the_tick_after_dwell_reports_minimum() {
        let sky = StaticSky {
            objects: vec![
                (object(2, 60.0, 40.0), 0..100),
                (object(1, 30.0, 45.0), 0..100),
            ],
        };
        let table = priorities(&[(1, 1, "A"), (2, 2, "B")]);
        let mut scheduler = ObservationScheduler::new(settings(1, 13));
        let records = scheduler.run(&sky, &table, None).unwrap();
        assert_eq!(records.len(), 13);

        assert!(records[0].has_comment("INITIAL::A"));
        assert_eq!(records[0].dwell_ticks, -1);
        for (i, record) in records.iter().enumerate().take(12).skip(1) {
            assert_eq!(record.mode, Mode::Observing, "tick {i}");
            assert_eq!(record.target_name.as_deref(), Some("A"));
            assert_eq!(record.dwell_ticks, i as i64 - 1);
            assert_eq!(record.priority, 1);
        }

        // tick 0 turns with the sentinel, tick 1 is the first observing tick at dwell 0
        assert_eq!(records[1].dwell_ticks, 0);
        assert_eq!(records[11].dwell_ticks, MIN_DWELL);
        assert_eq!(
            records.iter().position(|r| r.has_comment("TIME_FOR_NEW::B")),
            Some(MIN_DWELL as usize + 2)
        );
        let switch = &records[12];
        assert!(switch.has_comment("TIME_FOR_NEW::B"));
        assert_eq!(switch.mode, Mode::Turning);
        assert_eq!(switch.dwell_ticks, 0);
        assert_eq!(switch.target_name, None);
        assert_eq!(switch.priority, NO_TARGET_PRIORITY);
        assert!(scheduler.state().recent_history.contains(1));

        let time = start() + Duration::minutes(13);
        let candidates = scheduler
            .candidates
            .build(&sky, time, &table, &scheduler.state.station_pointing)
            .unwrap();
        let settled = scheduler.advance(time, 13, &candidates).unwrap();
        assert_eq!(settled.mode, Mode::Observing);
        assert_eq!(settled.target_name.as_deref(), Some("B"));
        assert_eq!(settled.dwell_ticks, 1);
    }

    #[test]
    fn recently_observed_targets_are_skipped() {
        let a = candidate(1, "A", 1, 30.0, 40.0);
        let b = candidate(2, "B", 2, 35.0, 40.0);
        let c = candidate(3, "C", 3, 40.0, 40.0);
        let mut scheduler = ObservationScheduler::new(settings(2, 0));
        scheduler.state.recent_history.add(2);

        scheduler
            .advance(start(), 0, &[a.clone(), b.clone(), c.clone()])
            .unwrap();
        scheduler.state.dwell_ticks = MIN_DWELL;

        let record = scheduler.advance(start(), 1, &[a, b, c]).unwrap();
        assert!(record.has_comment("TIME_FOR_NEW::C"));
        assert_eq!(scheduler.state().current_target.as_ref().unwrap().id, 3);
    }

    #[test]
    fn no_switch_when_every_alternative_is_recent() {
        let a = candidate(1, "A", 1, 30.0, 40.0);
        let b = candidate(2, "B", 2, 35.0, 40.0);
        let mut scheduler = ObservationScheduler::new(settings(3, 0));
        scheduler.advance(start(), 0, &[a.clone(), b.clone()]).unwrap();
        scheduler.state.recent_history.add(2);
        scheduler.state.dwell_ticks = 15;

        let record = scheduler.advance(start(), 1, &[a, b]).unwrap();
        assert_eq!(record.mode, Mode::Observing);
        assert_eq!(record.target_name.as_deref(), Some("A"));
        assert_eq!(record.dwell_ticks, 16);
    }

    #[test]
    fn disappearing_target_is_replaced() {
        let sky = StaticSky {
            objects: vec![
                (object(1, 30.0, 45.0), 0..3),
                (object(2, 40.0, 40.0), 0..10),
                (object(3, 50.0, 40.0), 0..10),
            ],
        };
        let table = priorities(&[(1, 1, "A"), (2, 2, "B"), (3, 3, "C")]);
        let mut scheduler = ObservationScheduler::new(settings(2, 5));
        let records = scheduler.run(&sky, &table, None).unwrap();

        assert_eq!(records[2].target_name.as_deref(), Some("A"));
        let lost = &records[3];
        assert_eq!(lost.comments[..2], ["NOT_AVAILABLE::A", "SWITCH::B"]);
        assert_eq!(lost.mode, Mode::Turning);
        assert_eq!(lost.dwell_ticks, 0);

        assert_eq!(records[4].mode, Mode::Observing);
        assert_eq!(records[4].target_name.as_deref(), Some("B"));
        assert_eq!(records[4].dwell_ticks, 1);
    }

    #[test]
    fn replacement_skips_recent_unless_alone() {
        let a = candidate(1, "A", 1, 30.0, 40.0);
        let b = candidate(2, "B", 2, 35.0, 40.0);
        let c = candidate(3, "C", 3, 40.0, 40.0);

        let mut scheduler = ObservationScheduler::new(settings(2, 0));
        scheduler.advance(start(), 0, &[a.clone()]).unwrap();
        scheduler.state.recent_history.add(2);
        let record = scheduler.advance(start(), 1, &[b.clone(), c]).unwrap();
        assert!(record.has_comment("SWITCH::C"));

        let mut scheduler = ObservationScheduler::new(settings(2, 0));
        scheduler.advance(start(), 0, &[a]).unwrap();
        scheduler.state.recent_history.add(2);
        let record = scheduler.advance(start(), 1, &[b]).unwrap();
        assert!(record.has_comment("SWITCH::B"));
    }

    #[test]
    fn replacement_falls_back_to_first_when_all_are_recent() {
        let a = candidate(1, "A", 1, 30.0, 40.0);
        let b = candidate(2, "B", 2, 35.0, 40.0);
        let c = candidate(3, "C", 3, 40.0, 40.0);

        let mut scheduler = ObservationScheduler::new(settings(3, 0));
        scheduler.advance(start(), 0, &[a]).unwrap();
        scheduler.state.recent_history.add(2);
        scheduler.state.recent_history.add(3);

        let record = scheduler.advance(start(), 1, &[b, c]).unwrap();
        assert_eq!(record.comments[..2], ["NOT_AVAILABLE::A", "SWITCH::B"]);
        assert_eq!(record.mode, Mode::Turning);
        assert_eq!(record.dwell_ticks, 0);
        assert_eq!(scheduler.state().current_target.as_ref().unwrap().id, 2);
    }

    #[test]
    fn run_rejects_window_past_supported_dates() {
        let sky = StaticSky {
            objects: vec![(object(1, 30.0, 45.0), 0..10)],
        };
        let mut s = settings(0, 1000);
        s.tick_interval = Duration::days(365_000);

        let mut scheduler = ObservationScheduler::new(s);
        let err = scheduler
            .run(&sky, &priorities(&[(1, 1, "A")]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Configuration(ConfigError::WindowOutOfRange { ticks: 1000, .. })
        ));
    }

    #[test]
    fn slews_the_short_way_across_north() {
        let mut s = settings(0, 0);
        s.initial_pointing = PointingState::from_degrees(350.0, 40.0, 0.0);
        let mut scheduler = ObservationScheduler::new(s);

        let target = candidate(1, "A", 1, 10.0, 40.0);
        let record = scheduler.advance(start(), 0, &[target]).unwrap();

        assert!((record.azimuth_deg - 10.0).abs() < 1e-9);
        assert!(!record.has_comment("BIG_AZ"));
        assert!(!record.has_comment("FAR_AWAY"));
    }

    #[test]
    fn slew_is_clamped_per_axis() {
        let mut s = settings(0, 0);
        s.initial_pointing = PointingState::from_degrees(0.0, 10.0, 0.0);
        let mut scheduler = ObservationScheduler::new(s);

        let target = candidate(1, "A", 1, 120.0, 80.0);
        let first = scheduler.advance(start(), 0, &[target.clone()]).unwrap();
        assert!((first.azimuth_deg - 50.0).abs() < 1e-9);
        assert!((first.elevation_deg - 60.0).abs() < 1e-9);
        assert!(first.has_comment("BIG_AZ"));
        assert!(first.has_comment("BIG_EL"));
        assert!(first.has_comment("FAR_AWAY"));
        assert_eq!(first.mode, Mode::Turning);
        assert_eq!(first.dwell_ticks, -1);

        let second = scheduler.advance(start(), 1, &[target.clone()]).unwrap();
        assert!((second.azimuth_deg - 100.0).abs() < 1e-9);
        assert!((second.elevation_deg - 80.0).abs() < 1e-9);
        assert!(second.has_comment("FAR_AWAY"));
        assert!(!second.has_comment("BIG_EL"));
        assert_eq!(second.mode, Mode::Turning);
        assert_eq!(second.dwell_ticks, 0);
        assert_eq!(second.target_name, None);

        let third = scheduler.advance(start(), 2, &[target]).unwrap();
        assert!((third.azimuth_deg - 120.0).abs() < 1e-9);
        assert_eq!(third.mode, Mode::Observing);
        assert_eq!(third.dwell_ticks, 1);
    }

    #[test]
    fn invariants_hold_over_a_busy_sky() {
        let objects = (0..8)
            .map(|i| {
                let id = i + 1;
                let az = (i as f64 * 97.0) % 360.0;
                let el = 15.0 + (i as f64 * 9.0);
                let start_tick = i * 7;
                (object(id, az, el), start_tick..start_tick + 40)
            })
            .chain(std::iter::once((object(100, 180.0, 20.0), 0..300)))
            .collect();
        let sky = StaticSky { objects };
        let table: PriorityTable = (1..=8)
            .map(|id| entry(id, id as i64, &format!("S{id}")))
            .chain(std::iter::once(entry(100, 50, "ANCHOR")))
            .collect();

        let mut s = settings(3, 120);
        s.sort_column = SortColumn::Chord;
        let limit = s.slew_limit_rad();
        let mut scheduler = ObservationScheduler::new(s);
        let mut previous = scheduler.state().station_pointing;
        let mut previous_record: Option<ActionRecord> = None;

        for tick in 0..120 {
            let time = start() + Duration::minutes(tick as i64);
            let candidates = scheduler
                .candidates
                .build(&sky, time, &table, &scheduler.state.station_pointing)
                .unwrap();
            let record = scheduler.advance(time, tick, &candidates).unwrap();
            let state = scheduler.state();

            assert!((0.0..TAU).contains(&state.station_pointing.azimuth));
            assert!(angular_step(previous.azimuth, state.station_pointing.azimuth) <= limit + 1e-9);
            assert!(
                (state.station_pointing.elevation - previous.elevation).abs() <= limit + 1e-9
            );
            assert!(state.recent_history.len() <= 3);
            if tick > 0 {
                assert!(record.dwell_ticks >= 0);
            }

            if let Some(prev) = &previous_record {
                let same_target = record.target_norad_id.is_some()
                    && record.target_norad_id == prev.target_norad_id;
                if record.mode == Mode::Observing && same_target {
                    assert_eq!(record.dwell_ticks, prev.dwell_ticks + 1, "tick {tick}");
                }
            }
            if record.has_comment("TIME_FOR_NEW") || record.has_comment("SWITCH") {
                assert!(record.dwell_ticks == 0 || record.mode == Mode::Observing);
            }

            previous = state.station_pointing;
            previous_record = Some(record);
        }
    }

    #[test]
    fn zero_skip_known_keeps_history_empty() {
        let sky = StaticSky {
            objects: vec![
                (object(1, 30.0, 45.0), 0..60),
                (object(2, 40.0, 40.0), 0..60),
            ],
        };
        let table = priorities(&[(1, 1, "A"), (2, 2, "B")]);
        let mut scheduler = ObservationScheduler::new(settings(0, 60));
        let records = scheduler.run(&sky, &table, None).unwrap();
        assert!(scheduler.state().recent_history.is_empty());
        assert!(records.iter().any(|r| r.has_comment("TIME_FOR_NEW::B")));
    }

    #[test]
    fn abort_signal_stops_run() {
        let sky = StaticSky {
            objects: vec![(object(1, 30.0, 45.0), 0..60)],
        };
        let (tx, rx) = mpsc::channel();
        tx.send(AbortSignal {
            reason: "operator request".into(),
        })
        .unwrap();

        let mut scheduler = ObservationScheduler::new(settings(0, 60));
        let records = scheduler
            .run(&sky, &priorities(&[(1, 1, "A")]), Some(&rx))
            .unwrap();
        assert!(records.is_empty());
    }
}
