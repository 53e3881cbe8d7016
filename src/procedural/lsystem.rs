//! L-systems and their 3D turtle interpretation.
//!
//! Rewriting is parallel: in every iteration each symbol is replaced by its
//! successor at the same time, symbols without a rule are copied unchanged.
//!
//! Turtle commands:
//!
//! | symbol | action |
//! |---|---|
//! | `F`, `G` | move forward and draw a segment |
//! | `f` | move forward without drawing |
//! | `+`, `-` | yaw left / right |
//! | `&`, `^` | pitch down / up |
//! | `\`, `/` | roll left / right |
//! | `\|` | turn around |
//! | `[`, `]` | push / pop the turtle state |
//!
//! Every other symbol is ignored by the turtle.

use std::collections::HashMap;

use cgmath::{Deg, Quaternion, Rad, Rotation, Rotation3, Vector3, Zero};

use crate::math::Aabb;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LSystemError {
    #[error("rule for {0:?} is defined twice")]
    DuplicateRule(char),
    #[error("symbol {symbol:?} at position {position} is not in the alphabet")]
    UnknownSymbol { symbol: char, position: usize },
    #[error("expansion grew to {len} symbols, the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("unbalanced bracket at position {0}")]
    UnbalancedBrackets(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LSystem {
    pub axiom: String,
    pub rules: HashMap<char, String>,
    /// Expansion stops with [`LSystemError::TooLong`] beyond this many symbols.
    pub max_len: usize,
}

impl LSystem {
    pub const DEFAULT_MAX_LEN: usize = 1 << 20;

    pub fn new<I, S>(axiom: &str, rules: I) -> Result<Self, LSystemError>
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for (symbol, successor) in rules {
            if map.insert(symbol, successor.into()).is_some() {
                return Err(LSystemError::DuplicateRule(symbol));
            }
        }
        Ok(Self {
            axiom: axiom.to_string(),
            rules: map,
            max_len: Self::DEFAULT_MAX_LEN,
        })
    }

    /// Check that the axiom, rule symbols and successors only use `alphabet`.
    ///
    /// Positions refer to the axiom followed by each successor in turn.
    pub fn validate_alphabet(&self, alphabet: &str) -> Result<(), LSystemError> {
        let check = |text: &str, offset: usize| {
            text.chars()
                .enumerate()
                .find(|(_, c)| !alphabet.contains(*c))
                .map(|(i, symbol)| LSystemError::UnknownSymbol {
                    symbol,
                    position: offset + i,
                })
        };
        if let Some(e) = check(&self.axiom, 0) {
            return Err(e);
        }
        let mut offset = self.axiom.chars().count();
        let mut symbols: Vec<&char> = self.rules.keys().collect();
        symbols.sort();
        for symbol in symbols {
            if !alphabet.contains(*symbol) {
                return Err(LSystemError::UnknownSymbol {
                    symbol: *symbol,
                    position: offset,
                });
            }
            let successor = &self.rules[symbol];
            if let Some(e) = check(successor, offset) {
                return Err(e);
            }
            offset += successor.chars().count();
        }
        Ok(())
    }

    pub fn generate(&self, iterations: usize) -> Result<String, LSystemError> {
        let successor_len: HashMap<char, usize> = self
            .rules
            .iter()
            .map(|(symbol, successor)| (*symbol, successor.chars().count()))
            .collect();
        let mut current = self.axiom.clone();
        let mut len = current.chars().count();
        for _ in 0..iterations {
            let mut next = String::with_capacity(current.len() * 2);
            len = 0;
            for c in current.chars() {
                match self.rules.get(&c) {
                    Some(successor) => {
                        next.push_str(successor);
                        len += successor_len[&c];
                    }
                    None => {
                        next.push(c);
                        len += 1;
                    }
                }
                if len > self.max_len {
                    return Err(LSystemError::TooLong {
                        len,
                        max: self.max_len,
                    });
                }
            }
            current = next;
        }
        log::debug!("L-system expanded to {len} symbols after {iterations} iterations");
        Ok(current)
    }
}

/// A drawn piece of the turtle path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: Vector3<f32>,
    pub end: Vector3<f32>,
    /// Bracket nesting level the segment was drawn at.
    pub depth: usize,
}

#[derive(Clone, Copy, Debug)]
struct TurtleState {
    position: Vector3<f32>,
    orientation: Quaternion<f32>,
}

/// Walks a command string, starting at the origin and heading up the y axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Turtle {
    pub angle: Rad<f32>,
    pub step: f32,
}

impl Turtle {
    pub fn new<A: Into<Rad<f32>>>(angle: A, step: f32) -> Self {
        Self {
            angle: angle.into(),
            step,
        }
    }

    pub fn interpret(&self, commands: &str) -> Result<Vec<Segment>, LSystemError> {
        let mut state = TurtleState {
            position: Vector3::zero(),
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        };
        let mut stack: Vec<(TurtleState, usize)> = Vec::new();
        let mut segments = Vec::new();
        let a = self.angle;
        // local frame: heading +y, left -x, up +z
        let turn = |state: &mut TurtleState, axis: Vector3<f32>, angle: Rad<f32>| {
            state.orientation = state.orientation * Quaternion::from_axis_angle(axis, angle);
        };

        for (position, c) in commands.chars().enumerate() {
            match c {
                'F' | 'G' | 'f' => {
                    let heading = state.orientation.rotate_vector(Vector3::unit_y());
                    let end = state.position + heading * self.step;
                    if c != 'f' {
                        segments.push(Segment {
                            start: state.position,
                            end,
                            depth: stack.len(),
                        });
                    }
                    state.position = end;
                }
                '+' => turn(&mut state, Vector3::unit_z(), a),
                '-' => turn(&mut state, Vector3::unit_z(), -a),
                '&' => turn(&mut state, Vector3::unit_x(), a),
                '^' => turn(&mut state, Vector3::unit_x(), -a),
                '\\' => turn(&mut state, Vector3::unit_y(), a),
                '/' => turn(&mut state, Vector3::unit_y(), -a),
                '|' => turn(&mut state, Vector3::unit_z(), Rad(std::f32::consts::PI)),
                '[' => stack.push((state, position)),
                ']' => match stack.pop() {
                    Some((saved, _)) => state = saved,
                    None => return Err(LSystemError::UnbalancedBrackets(position)),
                },
                _ => {}
            }
        }
        if let Some((_, position)) = stack.pop() {
            return Err(LSystemError::UnbalancedBrackets(position));
        }
        Ok(segments)
    }
}

/// An L-system together with the turtle parameters that draw it.
#[derive(Clone, Debug, PartialEq)]
pub struct Fractal {
    pub lsystem: LSystem,
    pub angle: Deg<f32>,
    pub scale: f32,
}

impl Fractal {
    pub fn new(lsystem: LSystem, angle: Deg<f32>, scale: f32) -> Self {
        Self {
            lsystem,
            angle,
            scale,
        }
    }

    pub fn segments(&self, iterations: usize) -> Result<Vec<Segment>, LSystemError> {
        let commands = self.lsystem.generate(iterations)?;
        Turtle::new(self.angle, self.scale).interpret(&commands)
    }

    pub fn bounds(&self, iterations: usize) -> Result<Aabb, LSystemError> {
        Ok(segments_bounds(&self.segments(iterations)?))
    }
}

pub fn segments_bounds(segments: &[Segment]) -> Aabb {
    Aabb::from_points(segments.iter().flat_map(|s| [s.start, s.end]))
}

/// Several fractals grown side by side, each moved by its own offset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerativeModel {
    pub fractals: Vec<(Fractal, Vector3<f32>)>,
}

impl GenerativeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fractal: Fractal, offset: Vector3<f32>) -> &mut Self {
        self.fractals.push((fractal, offset));
        self
    }

    pub fn segments(&self, iterations: usize) -> Result<Vec<Segment>, LSystemError> {
        let mut out = Vec::new();
        for (fractal, offset) in &self.fractals {
            out.extend(fractal.segments(iterations)?.into_iter().map(|s| Segment {
                start: s.start + offset,
                end: s.end + offset,
                depth: s.depth,
            }));
        }
        Ok(out)
    }
}
