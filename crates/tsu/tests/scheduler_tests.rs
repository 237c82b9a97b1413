//! Scheduler behavior tests against a scripted mock controller.

use flashsim_tsu::{FlashController, OutOfOrderScheduler, TransactionScheduler};
use flashsim_types::{
    ChannelId, ChannelStatus, ChipLocation, ChipStatus, FlashTransaction, PhysicalPageAddress,
    PlaneMask, SuspensionConfig, TopologyConfig, TransactionId, TransactionKind,
    TransactionSource,
};
use std::collections::HashMap;
use std::time::Duration;

/// Hardware-state stand-in: statuses are scripted by the test, dispatched
/// commands are recorded, and the channel goes busy on dispatch exactly like
/// the real bus.
struct MockController {
    channels: Vec<ChannelStatus>,
    chip_status: HashMap<ChipLocation, ChipStatus>,
    finish_times: HashMap<ChipLocation, Duration>,
    suspended: Vec<ChipLocation>,
    sent: Vec<(ChipLocation, Vec<FlashTransaction>)>,
}

impl MockController {
    fn new(topology: &TopologyConfig) -> Self {
        Self {
            channels: vec![ChannelStatus::Idle; topology.channels as usize],
            chip_status: HashMap::new(),
            finish_times: HashMap::new(),
            suspended: Vec::new(),
            sent: Vec::new(),
        }
    }

    fn set_chip_status(&mut self, chip: ChipLocation, status: ChipStatus, finish: Duration) {
        self.chip_status.insert(chip, status);
        self.finish_times.insert(chip, finish);
    }

    fn release_channel(&mut self, channel: ChannelId) {
        self.channels[channel as usize] = ChannelStatus::Idle;
    }

    fn sent_kinds(&self) -> Vec<TransactionKind> {
        self.sent
            .iter()
            .map(|(_, bundle)| bundle[0].kind)
            .collect()
    }
}

impl FlashController for MockController {
    fn channel_status(&self, channel: ChannelId) -> ChannelStatus {
        self.channels[channel as usize]
    }

    fn chip_status(&self, chip: ChipLocation) -> ChipStatus {
        self.chip_status
            .get(&chip)
            .copied()
            .unwrap_or(ChipStatus::Idle)
    }

    fn expected_finish_time(&self, chip: ChipLocation) -> Duration {
        self.finish_times.get(&chip).copied().unwrap_or_default()
    }

    fn has_suspended_command(&self, chip: ChipLocation) -> bool {
        self.suspended.contains(&chip)
    }

    fn send_command(&mut self, chip: ChipLocation, bundle: Vec<FlashTransaction>) {
        assert_eq!(
            self.channels[chip.channel as usize],
            ChannelStatus::Idle,
            "command issued on busy channel"
        );
        assert!(!bundle.is_empty());

        // Every bundle must target one die with pairwise-distinct planes.
        let die = bundle[0].address.die;
        let mut claimed = PlaneMask::default();
        for transaction in &bundle {
            assert_eq!(transaction.address.die, die, "bundle spans dies");
            assert!(
                !claimed.contains(transaction.address.plane),
                "two bundle members share plane {}",
                transaction.address.plane
            );
            claimed.set(transaction.address.plane);
        }

        self.channels[chip.channel as usize] = ChannelStatus::Busy;
        self.sent.push((chip, bundle));
    }
}

fn small_topology() -> TopologyConfig {
    TopologyConfig {
        channels: 1,
        chips_per_channel: 1,
        dies_per_chip: 1,
        planes_per_die: 4,
        pages_per_die: 256,
    }
}

fn scheduler(topology: TopologyConfig) -> OutOfOrderScheduler {
    OutOfOrderScheduler::new(topology, SuspensionConfig::default()).unwrap()
}

fn user_read(id: u64, address: PhysicalPageAddress) -> FlashTransaction {
    FlashTransaction::read(TransactionId(id), TransactionSource::UserIo, address, id, id)
}

fn submit_all(
    tsu: &mut OutOfOrderScheduler,
    ctrl: &mut MockController,
    transactions: Vec<FlashTransaction>,
) {
    tsu.prepare_for_submission();
    for transaction in transactions {
        tsu.submit(transaction);
    }
    tsu.schedule(ctrl);
}

#[test]
fn full_bundle_drains_in_one_command() {
    // Topology 1x1x1x4; four reads to planes 0-3 of the same page must go
    // out as a single multi-plane command with mask 0b1111.
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let reads = (0..4)
        .map(|plane| user_read(plane as u64, PhysicalPageAddress::new(0, 0, 0, plane, 7)))
        .collect();
    submit_all(&mut tsu, &mut ctrl, reads);

    assert_eq!(ctrl.sent.len(), 1);
    let (chip, bundle) = &ctrl.sent[0];
    assert_eq!(*chip, ChipLocation::new(0, 0));
    assert_eq!(bundle.len(), 4);

    let mut mask = PlaneMask::default();
    for transaction in bundle {
        mask.set(transaction.address.plane);
    }
    assert_eq!(mask.bits(), 0b1111);
    assert_eq!(tsu.queued(), 0);
}

#[test]
fn plane_conflict_leaves_loser_queued() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let transactions = vec![
        user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 7)),
        user_read(2, PhysicalPageAddress::new(0, 0, 0, 0, 7)),
        user_read(3, PhysicalPageAddress::new(0, 0, 0, 1, 7)),
    ];
    submit_all(&mut tsu, &mut ctrl, transactions);

    assert_eq!(ctrl.sent.len(), 1);
    assert_eq!(ctrl.sent[0].1.len(), 2);
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn multi_plane_bundle_requires_matching_page() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let transactions = vec![
        user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 7)),
        user_read(2, PhysicalPageAddress::new(0, 0, 0, 1, 8)),
    ];
    submit_all(&mut tsu, &mut ctrl, transactions);

    assert_eq!(ctrl.sent.len(), 1);
    let bundle = &ctrl.sent[0].1;
    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle[0].address.page, 7);
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn secondary_queue_fills_remaining_planes() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let gc_read = |id: u64, plane| {
        FlashTransaction::read(
            TransactionId(id),
            TransactionSource::GcWl,
            PhysicalPageAddress::new(0, 0, 0, plane, 7),
            id,
            id,
        )
    };
    let transactions = vec![
        user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 7)),
        user_read(2, PhysicalPageAddress::new(0, 0, 0, 1, 7)),
        gc_read(3, 2),
        gc_read(4, 3),
    ];
    submit_all(&mut tsu, &mut ctrl, transactions);

    assert_eq!(ctrl.sent.len(), 1);
    let bundle = &ctrl.sent[0].1;
    assert_eq!(bundle.len(), 4);
    // Primary (user) members precede secondary (GC) fill.
    assert_eq!(bundle[0].source, TransactionSource::UserIo);
    assert_eq!(bundle[1].source, TransactionSource::UserIo);
    assert_eq!(bundle[2].source, TransactionSource::GcWl);
    assert_eq!(bundle[3].source, TransactionSource::GcWl);
    assert_eq!(tsu.queued(), 0);
}

#[test]
fn mapping_reads_preempt_user_reads() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let mapping_read = FlashTransaction::read(
        TransactionId(1),
        TransactionSource::Mapping,
        PhysicalPageAddress::new(0, 0, 0, 0, 3),
        1,
        1,
    );
    let transactions = vec![
        user_read(2, PhysicalPageAddress::new(0, 0, 0, 1, 3)),
        mapping_read,
    ];
    submit_all(&mut tsu, &mut ctrl, transactions);

    assert_eq!(ctrl.sent.len(), 1);
    let bundle = &ctrl.sent[0].1;
    assert_eq!(bundle.len(), 2);
    assert_eq!(bundle[0].source, TransactionSource::Mapping);
    assert_eq!(bundle[1].source, TransactionSource::UserIo);
}

#[test]
fn reads_dispatch_before_writes_before_erases() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let chip = ChipLocation::new(0, 0);
    let transactions = vec![
        FlashTransaction::erase(TransactionId(1), PhysicalPageAddress::new(0, 0, 0, 0, 0)),
        FlashTransaction::write(
            TransactionId(2),
            TransactionSource::UserIo,
            PhysicalPageAddress::new(0, 0, 0, 0, 9),
            2,
            2,
        ),
        user_read(3, PhysicalPageAddress::new(0, 0, 0, 0, 5)),
    ];
    submit_all(&mut tsu, &mut ctrl, transactions);

    // One command per idle opportunity; the read wins the first.
    assert_eq!(ctrl.sent_kinds(), vec![TransactionKind::Read]);

    ctrl.release_channel(0);
    tsu.on_chip_idle(&mut ctrl, chip);
    assert_eq!(
        ctrl.sent_kinds(),
        vec![TransactionKind::Read, TransactionKind::Write]
    );

    ctrl.release_channel(0);
    tsu.on_chip_idle(&mut ctrl, chip);
    assert_eq!(
        ctrl.sent_kinds(),
        vec![
            TransactionKind::Read,
            TransactionKind::Write,
            TransactionKind::Erase
        ]
    );
    assert_eq!(tsu.queued(), 0);
}

#[test]
fn channel_idle_visits_chips_round_robin() {
    let topology = TopologyConfig {
        channels: 1,
        chips_per_channel: 4,
        dies_per_chip: 1,
        planes_per_die: 4,
        pages_per_die: 256,
    };
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    // Every chip holds one ready read. Submission dispatches to chip 0 and
    // leaves the channel busy.
    let transactions = (0..4)
        .map(|chip| user_read(chip as u64, PhysicalPageAddress::new(0, chip, 0, 0, 1)))
        .collect();
    submit_all(&mut tsu, &mut ctrl, transactions);

    // Each channel-idle signal serves exactly one more chip, in rotation.
    for _ in 0..3 {
        ctrl.release_channel(0);
        tsu.on_channel_idle(&mut ctrl, 0);
    }

    let served: Vec<u32> = ctrl.sent.iter().map(|(chip, _)| chip.chip).collect();
    assert_eq!(served, vec![0, 1, 2, 3]);
    assert_eq!(tsu.queued(), 0);
}

#[test]
fn chip_idle_respects_busy_channel() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![
            user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 1)),
            user_read(2, PhysicalPageAddress::new(0, 0, 0, 0, 2)),
        ],
    );
    assert_eq!(ctrl.sent.len(), 1);

    // Channel still busy with the first transfer: the chip-idle signal must
    // not issue a second command.
    tsu.on_chip_idle(&mut ctrl, ChipLocation::new(0, 0));
    assert_eq!(ctrl.sent.len(), 1);

    ctrl.release_channel(0);
    tsu.on_chip_idle(&mut ctrl, ChipLocation::new(0, 0));
    assert_eq!(ctrl.sent.len(), 2);
}

#[test]
fn nested_prepare_keeps_outer_batch() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    tsu.prepare_for_submission();
    tsu.submit(user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 7)));
    tsu.submit(user_read(2, PhysicalPageAddress::new(0, 0, 0, 1, 7)));

    // Nested preparation while the outer batch is still open.
    tsu.prepare_for_submission();
    tsu.submit(user_read(3, PhysicalPageAddress::new(0, 0, 0, 2, 7)));
    tsu.schedule(&mut ctrl);

    // Inner close must not run the policy or drop staged work.
    assert!(ctrl.sent.is_empty());

    tsu.schedule(&mut ctrl);
    assert_eq!(ctrl.sent.len(), 1);
    assert_eq!(ctrl.sent[0].1.len(), 3);
}

#[test]
fn unready_transactions_are_skipped() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let blocked_write = FlashTransaction::write(
        TransactionId(1),
        TransactionSource::UserIo,
        PhysicalPageAddress::new(0, 0, 0, 0, 4),
        1,
        1,
    )
    .with_related_read(TransactionId(99));
    let ready_write = FlashTransaction::write(
        TransactionId(2),
        TransactionSource::UserIo,
        PhysicalPageAddress::new(0, 0, 0, 1, 4),
        2,
        2,
    );
    submit_all(&mut tsu, &mut ctrl, vec![blocked_write, ready_write]);

    assert_eq!(ctrl.sent.len(), 1);
    assert_eq!(ctrl.sent[0].1[0].id, TransactionId(2));
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn erase_with_pending_page_movements_waits() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);

    let erase = FlashTransaction::erase(TransactionId(1), PhysicalPageAddress::new(0, 0, 0, 0, 0))
        .with_page_movements(vec![TransactionId(7)]);
    submit_all(&mut tsu, &mut ctrl, vec![erase]);

    assert!(ctrl.sent.is_empty());
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn erase_requires_idle_chip() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    ctrl.set_chip_status(chip, ChipStatus::Reading, Duration::from_micros(40));
    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![FlashTransaction::erase(
            TransactionId(1),
            PhysicalPageAddress::new(0, 0, 0, 0, 0),
        )],
    );

    assert!(ctrl.sent.is_empty());
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn read_suspends_long_erase() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    // Erase finishes 2ms from now: well above the 700us threshold.
    ctrl.set_chip_status(chip, ChipStatus::Erasing, Duration::from_millis(2));
    tsu.set_time(Duration::ZERO);

    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 1))],
    );

    assert_eq!(ctrl.sent.len(), 1);
    assert!(ctrl.sent[0].1[0].suspend_required);
}

#[test]
fn read_waits_out_short_erase() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    // Only 100us of erase left: not worth suspending.
    ctrl.set_chip_status(chip, ChipStatus::Erasing, Duration::from_micros(100));
    tsu.set_time(Duration::ZERO);

    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 1))],
    );

    assert!(ctrl.sent.is_empty());
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn read_suspends_long_program() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    ctrl.set_chip_status(chip, ChipStatus::Writing, Duration::from_millis(1));
    tsu.set_time(Duration::ZERO);

    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 1))],
    );

    assert_eq!(ctrl.sent.len(), 1);
    assert!(ctrl.sent[0].1[0].suspend_required);
}

#[test]
fn write_suspends_long_erase() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    ctrl.set_chip_status(chip, ChipStatus::Erasing, Duration::from_millis(2));
    tsu.set_time(Duration::ZERO);

    let write = FlashTransaction::write(
        TransactionId(1),
        TransactionSource::UserIo,
        PhysicalPageAddress::new(0, 0, 0, 0, 6),
        1,
        1,
    );
    submit_all(&mut tsu, &mut ctrl, vec![write]);

    assert_eq!(ctrl.sent.len(), 1);
    assert_eq!(ctrl.sent[0].1[0].kind, TransactionKind::Write);
    assert!(ctrl.sent[0].1[0].suspend_required);
}

#[test]
fn disabled_suspension_never_suspends() {
    let topology = small_topology();
    let mut tsu = OutOfOrderScheduler::new(topology, SuspensionConfig::disabled()).unwrap();
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    ctrl.set_chip_status(chip, ChipStatus::Erasing, Duration::from_secs(1));
    tsu.set_time(Duration::ZERO);

    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 1))],
    );

    assert!(ctrl.sent.is_empty());
    assert_eq!(tsu.queued(), 1);
}

#[test]
fn already_suspended_chip_is_not_suspended_again() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    let chip = ChipLocation::new(0, 0);

    ctrl.set_chip_status(chip, ChipStatus::Erasing, Duration::from_secs(1));
    ctrl.suspended.push(chip);
    tsu.set_time(Duration::ZERO);

    submit_all(
        &mut tsu,
        &mut ctrl,
        vec![user_read(1, PhysicalPageAddress::new(0, 0, 0, 0, 1))],
    );

    assert!(ctrl.sent.is_empty());
    assert_eq!(tsu.queued(), 1);
}

#[test]
#[should_panic(expected = "without a matching prepare_for_submission")]
fn schedule_without_prepare_panics() {
    let topology = small_topology();
    let mut tsu = scheduler(topology);
    let mut ctrl = MockController::new(&topology);
    tsu.schedule(&mut ctrl);
}
