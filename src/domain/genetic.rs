//! Genetic search over strategy phenotypes.
//!
//! Each generation tops the population up with mutants, shuffles it and
//! runs pairwise contests: the first of each pair survives, and its
//! competitor's slot goes to a child of the winner when the first scores at
//! least as well. Fitness evaluation runs on the rayon pool; all random draws
//! happen on the calling thread, so a fixed seed reproduces a run.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::backtest::{BacktestConfig, BacktestResult, backtest};
use crate::domain::error::TicktraderError;
use crate::domain::phenotype::{Phenotype, PhenotypeSchema};
use crate::domain::strategy::StrategyKind;
use crate::domain::tick::Tick;

/// Upper bound on the size of the random starting population.
const MAX_INITIAL_POPULATION: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitnessKind {
    #[default]
    Profit,
    /// `profit * |profit| / loss` (or `profit * |profit|` with no loss).
    ///
    /// Not `profit² / loss`: the sign of profit is kept, so a loss always
    /// scores below any gain.
    RiskAdjusted,
}

impl FitnessKind {
    pub fn score(self, result: &BacktestResult) -> f64 {
        match self {
            FitnessKind::Profit => result.profit,
            FitnessKind::RiskAdjusted => {
                let profit = result.profit;
                if profit == 0.0 {
                    0.0
                } else if result.loss > 0.0 {
                    profit * profit.abs() / result.loss
                } else {
                    profit * profit.abs()
                }
            }
        }
    }
}

impl fmt::Display for FitnessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessKind::Profit => f.write_str("profit"),
            FitnessKind::RiskAdjusted => f.write_str("risk_adjusted"),
        }
    }
}

impl FromStr for FitnessKind {
    type Err = TicktraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "profit" => Ok(FitnessKind::Profit),
            "risk_adjusted" => Ok(FitnessKind::RiskAdjusted),
            other => Err(TicktraderError::ConfigInvalid {
                section: "optimizer".into(),
                key: "fitness".into(),
                reason: format!("unknown fitness '{other}', expected profit or risk_adjusted"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub population_size: usize,
    pub evolution_count: usize,
    pub seed: Option<u64>,
    pub fitness: FitnessKind,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            population_size: 20,
            evolution_count: 10,
            seed: None,
            fitness: FitnessKind::Profit,
        }
    }
}

/// A phenotype with its fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub phenotype: Phenotype,
    pub fitness: f64,
}

pub struct OptimizerRun<'a> {
    kind: StrategyKind,
    schema: PhenotypeSchema,
    ticks: &'a [Tick],
    backtest_config: BacktestConfig,
    config: OptimizerConfig,
    rng: StdRng,
    population: Vec<Phenotype>,
    generation: usize,
}

impl<'a> OptimizerRun<'a> {
    pub fn new(
        kind: StrategyKind,
        ticks: &'a [Tick],
        backtest_config: BacktestConfig,
        config: OptimizerConfig,
    ) -> Result<Self, TicktraderError> {
        if config.population_size == 0 {
            return Err(TicktraderError::ConfigInvalid {
                section: "optimizer".into(),
                key: "population_size".into(),
                reason: "population_size must be at least 1".into(),
            });
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let schema = kind.schema();
        let initial = rng
            .gen_range(1..=MAX_INITIAL_POPULATION)
            .min(config.population_size);
        let population = (0..initial).map(|_| schema.random(&mut rng)).collect();

        Ok(OptimizerRun {
            kind,
            schema,
            ticks,
            backtest_config,
            config,
            rng,
            population,
            generation: 0,
        })
    }

    pub fn population(&self) -> &[Phenotype] {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn fitness(&self, phenotype: &Phenotype) -> Result<f64, TicktraderError> {
        let result = backtest(self.kind, phenotype, self.ticks, &self.backtest_config)?;
        Ok(self.config.fitness.score(&result))
    }

    fn evaluate(&self, phenotypes: &[Phenotype]) -> Result<Vec<f64>, TicktraderError> {
        phenotypes.par_iter().map(|p| self.fitness(p)).collect()
    }

    /// Runs one generation and returns the best fitness seen while scoring it.
    pub fn evolve(&mut self) -> Result<f64, TicktraderError> {
        let mut population = std::mem::take(&mut self.population);
        while population.len() < self.config.population_size {
            let parent = &population[self.rng.gen_range(0..population.len())];
            let mutant = self.schema.mutate(parent, &mut self.rng);
            population.push(mutant);
        }
        population.shuffle(&mut self.rng);

        let scores = match self.evaluate(&population) {
            Ok(scores) => scores,
            Err(e) => {
                self.population = population;
                return Err(e);
            }
        };

        let mut next = Vec::with_capacity(population.len());
        for (pair, pair_scores) in population.chunks(2).zip(scores.chunks(2)) {
            match (pair, pair_scores) {
                ([first, second], [first_score, second_score]) => {
                    next.push(first.clone());
                    if first_score >= second_score {
                        let child = if self.rng.gen_bool(0.5) {
                            self.schema.mutate(first, &mut self.rng)
                        } else {
                            self.schema.crossover(first, second, &mut self.rng).0
                        };
                        next.push(child);
                    } else {
                        next.push(second.clone());
                    }
                }
                _ => next.extend(pair.iter().cloned()),
            }
        }

        self.population = next;
        self.generation += 1;
        let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        debug!(generation = self.generation, best, "generation scored");
        Ok(best)
    }

    /// Scores the current population and returns its fittest member.
    pub fn best(&self) -> Result<Scored, TicktraderError> {
        let scores = self.evaluate(&self.population)?;
        self.population
            .iter()
            .zip(scores)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(phenotype, fitness)| Scored {
                phenotype: phenotype.clone(),
                fitness,
            })
            .ok_or_else(|| TicktraderError::ConfigInvalid {
                section: "optimizer".into(),
                key: "population_size".into(),
                reason: "population is empty".into(),
            })
    }

    /// Runs every configured generation, then reports the best phenotype.
    pub fn run(&mut self) -> Result<Scored, TicktraderError> {
        info!(
            strategy = %self.kind,
            ticks = self.ticks.len(),
            population_size = self.config.population_size,
            evolutions = self.config.evolution_count,
            fitness = %self.config.fitness,
            "optimizing"
        );
        for _ in 0..self.config.evolution_count {
            let best = self.evolve()?;
            info!(
                generation = self.generation,
                of = self.config.evolution_count,
                best_fitness = best,
                "evolution finished"
            );
        }
        self.best()
    }
}
