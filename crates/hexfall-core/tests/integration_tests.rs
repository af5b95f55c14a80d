//! Integration tests for the Hexfall simulation core.
//!
//! These tests verify complete game flows from preparation through to victory.

use hexfall_core::board::{TileSpec, STANDARD_SPAWN_POSITIONS};
use hexfall_core::*;
use pretty_assertions::assert_eq;

/// Helper to get any valid action of a specific type
fn find_action<F>(game: &GameState, player: PlayerId, filter: F) -> Option<GameAction>
where
    F: Fn(&GameAction) -> bool,
{
    game.valid_actions(player).into_iter().find(filter)
}

fn new_game(players: usize, seed: u64) -> GameState {
    let mut config = GameConfig::seeded(seed);
    config.player_names.truncate(players);
    GameState::new(config).unwrap()
}

/// Run through the preparation round with the first valid placements
fn complete_setup(game: &mut GameState) {
    let mut iterations = 0;
    let max_iterations = 100;

    while matches!(game.phase, GamePhase::Preparation { .. }) && iterations < max_iterations {
        let player = game.current_player;
        let action = game.valid_actions(player)[0];
        game.apply_action(player, action).unwrap();
        iterations += 1;
    }

    assert!(
        !matches!(game.phase, GamePhase::Preparation { .. }),
        "Game should complete preparation within {} iterations",
        max_iterations
    );
}

/// Let seeded bots play until the game ends or `max_actions` is reached
fn play_with_bots(
    game: &mut GameState,
    difficulty: BotDifficulty,
    max_actions: usize,
) -> Vec<GameEvent> {
    let seed = game.seed();
    let mut bots: Vec<Bot> = game
        .players
        .iter()
        .map(|p| Bot::with_seed(p.id, difficulty, seed + u64::from(p.id)))
        .collect();

    let mut events = Vec::new();
    for _ in 0..max_actions {
        if game.is_finished() {
            break;
        }
        if !game.is_phase_complete() {
            events.extend(game.run_pending_steps());
            continue;
        }
        let player = game.current_player;
        let bot = &mut bots[usize::from(player) - 1];
        let action = bot
            .choose_action(game)
            .unwrap_or_else(|| panic!("bot {player} found nothing to do in {:?}", game.phase));
        let produced = game
            .apply_action(player, action)
            .unwrap_or_else(|e| panic!("bot {player} chose invalid {action:?}: {e}"));
        events.extend(produced);
    }
    events
}

#[test]
fn test_preparation_completes() {
    let mut game = new_game(4, 1);
    complete_setup(&mut game);

    for player in &game.players {
        assert_eq!(player.settlements.len(), 2, "each player places two settlements");
        assert_eq!(player.score, 2);
        let roads = game.board.roads().iter().filter(|r| r.owner == Some(player.id)).count();
        assert_eq!(roads, 2, "each player places two roads");
    }

    assert_eq!(
        game.phase,
        GamePhase::MainTurn {
            step: TurnStep::AwaitingRoll
        }
    );
    assert_eq!(game.current_player, 1);
}

#[test]
fn test_normal_turn_flow() {
    let mut game = new_game(2, 2);
    complete_setup(&mut game);
    let player = game.current_player;

    let roll = find_action(&game, player, |a| matches!(a, GameAction::RollDice));
    assert!(roll.is_some(), "Should be able to roll dice");

    let events = game.apply_action(player, GameAction::RollDice).unwrap();
    assert!(
        events.iter().any(|e| matches!(e, GameEvent::DiceRolled { .. })),
        "Should have dice roll event"
    );

    if let Some(bandit) = find_action(&game, player, |a| matches!(a, GameAction::PlaceBandit(_))) {
        game.apply_action(player, bandit).unwrap();
    }

    let events = game.apply_action(player, GameAction::EndTurn).unwrap();
    assert!(events.contains(&GameEvent::TurnEnded {
        player,
        next_player: 2
    }));
    assert_eq!(game.current_player, 2, "Turn should advance");
    assert_eq!(
        game.phase,
        GamePhase::MainTurn {
            step: TurnStep::AwaitingRoll
        }
    );
}

#[test]
fn test_building_requires_resources() {
    let mut game = new_game(2, 3);
    complete_setup(&mut game);
    game.phase = GamePhase::MainTurn {
        step: TurnStep::Building,
    };
    game.players[0].resources = ResourceHand::new();

    let actions = game.valid_actions(1);
    assert_eq!(actions, vec![GameAction::EndTurn]);
}

#[test]
fn test_seeded_sessions_are_reproducible() {
    let mut first = new_game(3, 42);
    let mut second = new_game(3, 42);

    let a = play_with_bots(&mut first, BotDifficulty::Easy, 600);
    let b = play_with_bots(&mut second, BotDifficulty::Easy, 600);

    assert_eq!(a, b);
    let scores = |g: &GameState| g.players.iter().map(|p| p.score).collect::<Vec<_>>();
    assert_eq!(scores(&first), scores(&second));
}

#[test]
fn test_different_seeds_differ() {
    let first = new_game(2, 1);
    let second = new_game(2, 2);
    let layout = |g: &GameState| {
        g.board
            .tiles()
            .iter()
            .map(|t| (t.tile_type, t.dice_number))
            .collect::<Vec<_>>()
    };
    assert_ne!(layout(&first), layout(&second));
}

#[test]
fn test_bot_self_play_runs_clean() {
    for seed in 0..4 {
        let players = 2 + (seed % 3) as usize;
        let mut game = new_game(players, seed);
        let difficulty = if seed % 2 == 0 {
            BotDifficulty::Medium
        } else {
            BotDifficulty::Easy
        };

        let events = play_with_bots(&mut game, difficulty, 20_000);
        assert!(game.turn_number > 1, "game {seed} should get past its first turn");

        if let Some(winner) = game.get_winner() {
            let player = game.get_player(winner).unwrap();
            assert!(player.score >= game.points_to_win());
            assert_eq!(
                events
                    .iter()
                    .filter(|e| matches!(e, GameEvent::GameWon { .. }))
                    .count(),
                1,
                "exactly one winner"
            );
        }
    }
}

#[test]
fn test_medium_bots_reach_a_winner() {
    let mut config = GameConfig::seeded(9);
    config.points_to_win = 5;
    let mut game = GameState::new(config).unwrap();

    play_with_bots(&mut game, BotDifficulty::Medium, 50_000);
    assert!(game.is_finished(), "four medium bots should reach five points");
    let winner = game.get_winner().unwrap();
    assert!(game.get_player(winner).unwrap().score >= 5);
}

#[test]
fn test_active_disaster_stops_yield() {
    let mut game = new_game(4, 5);
    complete_setup(&mut game);

    // default config: the first disaster follows the fourth finished turn
    for _ in 0..4 {
        game.phase = GamePhase::MainTurn {
            step: TurnStep::Building,
        };
        game.apply_action(game.current_player, GameAction::EndTurn).unwrap();
    }
    let events = game.run_pending_steps();
    let struck: Vec<TileId> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::DisasterTileStruck { tile, .. } => Some(*tile),
            _ => None,
        })
        .collect();

    let DisasterPhase::Active { tiles, .. } = game.disasters().phase() else {
        panic!("disaster should be active after its rollout");
    };
    assert_eq!(&struck, tiles);
    for &tile in tiles {
        assert!(game.board.tile(tile).suppressed_by_disaster);
        assert!(game.board.yield_resources(tile).is_empty());
    }
}

#[test]
fn test_specialty_node_lowers_rates() {
    let mut game = new_game(2, 6);
    let node = game
        .board
        .nodes()
        .iter()
        .find(|n| n.specialty == NodeSpecialty::ReducedTrading)
        .map(|n| n.id)
        .unwrap();

    let events = game.apply_action(1, GameAction::PlaceSettlement(node)).unwrap();
    assert!(events.contains(&GameEvent::ConversionRatesChanged {
        player: 1,
        specialty: NodeSpecialty::ReducedTrading
    }));
    for resource in Resource::ALL {
        assert_eq!(game.players[0].conversion_rates.rate(resource), 3);
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = GameConfig::from_json_str(r#"{"player_names": ["Solo"]}"#);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    let mut config = GameConfig::seeded(1);
    config.disasters.rollout_stagger_ticks = 0;
    assert!(matches!(GameState::new(config), Err(SetupError::Config(_))));
}

#[test]
fn test_custom_layout_session() {
    let board = Board::with_layout(&fixed_layout()).unwrap();
    let mut game = GameState::with_board(GameConfig::seeded(3), board).unwrap();
    assert_eq!(game.board.tile(game.board.desert()).pos, GridPos::new(2, 2));
    assert_eq!(game.board.bandit_tile(), game.board.desert());

    complete_setup(&mut game);
    assert!(game.players.iter().all(|p| p.score == 2));
}

/// Standard positions, desert in the middle, types and numbers in a fixed order
fn fixed_layout() -> Vec<TileSpec> {
    let mut kinds = [
        (TileType::Forest, 4),
        (TileType::Pasture, 4),
        (TileType::Farm, 4),
        (TileType::Claypit, 3),
        (TileType::Mountain, 3),
    ]
    .into_iter()
    .flat_map(|(kind, count)| std::iter::repeat(kind).take(count));
    let mut numbers = [2u8, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12].into_iter();

    STANDARD_SPAWN_POSITIONS
        .iter()
        .map(|&pos| {
            if pos == GridPos::new(2, 2) {
                (pos, TileType::Desert, None)
            } else {
                (pos, kinds.next().unwrap(), numbers.next())
            }
        })
        .collect()
}
