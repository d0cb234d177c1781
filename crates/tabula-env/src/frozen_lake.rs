//! FrozenLake grid world
//!
//! The agent crosses a frozen lake from `S` to `G`, walking on frozen tiles
//! `F` and avoiding holes `H`. On a slippery lake the agent moves in the
//! intended direction only one time in three, otherwise in one of the two
//! perpendicular directions. Reaching the goal pays 1; every other step pays
//! nothing. Falling in a hole or reaching the goal ends the episode.
//!
//! States are tile indices in row-major order; actions are
//! `0 = left, 1 = down, 2 = right, 3 = up`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tabula_core::{Domain, Environment, EnvironmentConfig, RLError, Result, Step, StepInfo};

/// Classic 4x4 layout
pub const MAP_4X4: [&str; 4] = ["SFFF", "FHFH", "FFFH", "HFFG"];

/// Configuration for [`FrozenLake`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrozenLakeConfig {
    /// Rows of the map, top first
    pub map: Vec<String>,
    /// Whether moves may slip sideways
    pub slippery: bool,
}

impl Default for FrozenLakeConfig {
    fn default() -> Self {
        Self {
            map: MAP_4X4.iter().map(|row| (*row).to_string()).collect(),
            slippery: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tile {
    Start,
    Frozen,
    Hole,
    Goal,
}

impl Tile {
    fn parse(c: char) -> Option<Self> {
        match c {
            'S' => Some(Self::Start),
            'F' => Some(Self::Frozen),
            'H' => Some(Self::Hole),
            'G' => Some(Self::Goal),
            _ => None,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Start => 'S',
            Self::Frozen => 'F',
            Self::Hole => 'H',
            Self::Goal => 'G',
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Hole | Self::Goal)
    }
}

/// FrozenLake environment
#[derive(Debug)]
pub struct FrozenLake {
    tiles: Vec<Tile>,
    ncol: usize,
    start: usize,
    position: usize,
    slippery: bool,
    states: Domain,
    actions: Domain,
    rng: StdRng,
}

impl FrozenLake {
    /// Create a lake from its layout
    pub fn new(config: &FrozenLakeConfig, seed: Option<u64>) -> Result<Self> {
        let ncol = config.map.first().map_or(0, |row| row.chars().count());
        if ncol == 0 {
            return Err(RLError::Configuration("the lake map is empty".to_string()));
        }

        let mut tiles = Vec::with_capacity(ncol * config.map.len());
        for row in &config.map {
            let width = row.chars().count();
            if width != ncol {
                return Err(RLError::DimensionMismatch {
                    expected: ncol,
                    actual: width,
                });
            }
            for c in row.chars() {
                let tile = Tile::parse(c).ok_or_else(|| {
                    RLError::Configuration(format!("unknown lake tile {c:?}"))
                })?;
                tiles.push(tile);
            }
        }

        let starts: Vec<usize> = tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| **tile == Tile::Start)
            .map(|(index, _)| index)
            .collect();
        let start = match starts.as_slice() {
            [start] => *start,
            _ => {
                return Err(RLError::Configuration(
                    "the lake needs exactly one start tile".to_string(),
                ))
            }
        };
        if !tiles.contains(&Tile::Goal) {
            return Err(RLError::Configuration("the lake has no goal tile".to_string()));
        }

        let last_state = i64::try_from(tiles.len() - 1)
            .map_err(|_| RLError::Configuration("the lake is too large".to_string()))?;

        Ok(Self {
            tiles,
            ncol,
            start,
            position: start,
            slippery: config.slippery,
            states: Domain::closed(0, last_state)?,
            actions: Domain::closed(0, 3)?,
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        })
    }

    /// Create a lake from a generic environment configuration.
    ///
    /// The environment specific parameters decode as a [`FrozenLakeConfig`].
    pub fn from_config(config: &EnvironmentConfig) -> Result<Self> {
        Self::new(&config.params()?, config.seed)
    }

    /// Number of tiles
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.tiles.len()
    }

    /// Tile index of the agent
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether moves may slip sideways
    #[must_use]
    pub fn is_slippery(&self) -> bool {
        self.slippery
    }

    fn nrow(&self) -> usize {
        self.tiles.len() / self.ncol
    }

    /// Tile reached by moving from `state` in `direction`; walls block
    fn moved(&self, state: usize, direction: usize) -> usize {
        let (row, col) = (state / self.ncol, state % self.ncol);
        let (row, col) = match direction {
            0 => (row, col.saturating_sub(1)),
            1 => ((row + 1).min(self.nrow() - 1), col),
            2 => (row, (col + 1).min(self.ncol - 1)),
            _ => (row.saturating_sub(1), col),
        };
        row * self.ncol + col
    }

    fn render_grid(&self) -> String {
        self.tiles
            .chunks(self.ncol)
            .enumerate()
            .map(|(row, tiles)| {
                tiles
                    .iter()
                    .enumerate()
                    .map(|(col, tile)| {
                        if row * self.ncol + col == self.position {
                            '@'
                        } else {
                            tile.symbol()
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Environment for FrozenLake {
    type State = usize;
    type Action = usize;

    fn states(&self) -> Option<&Domain> {
        Some(&self.states)
    }

    fn actions(&self) -> &Domain {
        &self.actions
    }

    fn reset(&mut self) -> Result<usize> {
        self.position = self.start;
        Ok(self.position)
    }

    fn step(&mut self, action: usize) -> Result<Step<usize>> {
        if action > 3 {
            return Err(RLError::InvalidAction(format!(
                "{action} is not a lake move; expected 0..=3"
            )));
        }
        if self.tiles[self.position].is_terminal() {
            return Err(RLError::Environment(
                "the episode is over; reset the lake first".to_string(),
            ));
        }

        let direction = if self.slippery {
            // Intended, or one of the two perpendicular moves.
            (action + 3 + self.rng.gen_range(0..3)) % 4
        } else {
            action
        };
        self.position = self.moved(self.position, direction);

        let tile = self.tiles[self.position];
        let reward = if tile == Tile::Goal { 1.0 } else { 0.0 };
        let mut step = Step::new(self.position, reward).done(tile.is_terminal());
        step.info = StepInfo::default()
            .with("tile", tile.symbol().to_string())
            .with("direction", direction);
        Ok(step)
    }

    fn render(&self) -> Result<()> {
        debug!(position = self.position, "\n{}", self.render_grid());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lake(slippery: bool) -> FrozenLake {
        FrozenLake::new(
            &FrozenLakeConfig {
                slippery,
                ..FrozenLakeConfig::default()
            },
            Some(0),
        )
        .unwrap()
    }

    #[test]
    fn the_shortest_path_reaches_the_goal() {
        let mut env = lake(false);
        assert_eq!(env.reset().unwrap(), 0);
        // down, down, right, down, right, right
        let path = [1, 1, 2, 1, 2, 2];
        let mut last = None;
        for action in path {
            last = Some(env.step(action).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.new_state, 15);
        assert_eq!(last.reward, 1.0);
        assert!(last.done);
        assert_eq!(last.info.fields["tile"], "G");
    }

    #[test]
    fn holes_end_the_episode_without_reward() {
        let mut env = lake(false);
        env.reset().unwrap();
        env.step(2).unwrap();
        let step = env.step(1).unwrap();
        assert_eq!(step.new_state, 5);
        assert_eq!(step.reward, 0.0);
        assert!(step.done);
        assert!(matches!(env.step(0), Err(RLError::Environment(_))));
        assert_eq!(env.reset().unwrap(), 0);
    }

    #[test]
    fn walls_block_movement() {
        let mut env = lake(false);
        env.reset().unwrap();
        assert_eq!(env.step(0).unwrap().new_state, 0);
        assert_eq!(env.step(3).unwrap().new_state, 0);
    }

    #[test]
    fn slippery_moves_are_intended_or_perpendicular() {
        let mut env = lake(true);
        let mut seen = [false; 4];
        for _ in 0..300 {
            env.reset().unwrap();
            // Pushing right from the start can only go right, down, or hit the top wall.
            let step = env.step(2).unwrap();
            let direction = step.info.fields["direction"].as_u64().unwrap();
            assert_ne!(direction, 0);
            seen[usize::try_from(direction).unwrap()] = true;
            assert!([0, 1, 4].contains(&step.new_state));
        }
        assert_eq!(seen, [false, true, true, true]);
    }

    #[test]
    fn domains_match_the_map() {
        let env = lake(true);
        assert_eq!(env.n_states(), 16);
        assert_eq!(env.states().and_then(Domain::cardinality), Some(16));
        assert_eq!(env.actions().cardinality(), Some(4));
        assert!(matches!(
            lake(false).step(4),
            Err(RLError::InvalidAction(_))
        ));
    }

    #[test]
    fn maps_are_validated() {
        let config = |rows: &[&str]| FrozenLakeConfig {
            map: rows.iter().map(|row| (*row).to_string()).collect(),
            slippery: false,
        };
        assert!(matches!(
            FrozenLake::new(&config(&["SF", "FFG"]), None),
            Err(RLError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            FrozenLake::new(&config(&["SX", "FG"]), None),
            Err(RLError::Configuration(_))
        ));
        assert!(matches!(
            FrozenLake::new(&config(&["SS", "FG"]), None),
            Err(RLError::Configuration(_))
        ));
        assert!(matches!(
            FrozenLake::new(&config(&["SF", "FF"]), None),
            Err(RLError::Configuration(_))
        ));
        assert!(matches!(
            FrozenLake::new(&config(&[]), None),
            Err(RLError::Configuration(_))
        ));
    }

    #[test]
    fn builds_from_environment_config() {
        let config: EnvironmentConfig =
            serde_json::from_str(r#"{"seed": 3, "map": ["SH", "FG"], "slippery": false}"#).unwrap();
        let mut env = FrozenLake::from_config(&config).unwrap();
        assert!(!env.is_slippery());
        assert_eq!(env.n_states(), 4);
        env.reset().unwrap();
        env.step(1).unwrap();
        assert!(env.step(2).unwrap().done);
        assert_eq!(env.position(), 3);
    }

    #[test]
    fn render_marks_the_agent() {
        let mut env = lake(false);
        env.reset().unwrap();
        env.step(2).unwrap();
        assert_eq!(env.render_grid(), "S@FF\nFHFH\nFFFH\nHFFG");
        assert!(env.render().is_ok());
    }
}
