//! Evolutionary search over (length, start)

use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Individuals drawn per tournament
const TOURNAMENT_SIZE: usize = 5;

/// Per-gene mutation probability
const MUTATION_RATE: f64 = 0.015;

/// A window in the population with its fitness
#[derive(Debug, Clone, Copy, PartialEq)]
struct Individual {
    length: usize,
    start: usize,
    dimension: usize,
    /// Evaluator quality, `-inf` when rejected
    fitness: f64,
}

impl Individual {
    fn fitter_than(&self, other: &Self) -> bool {
        self.fitness > other.fitness
    }
}

/// Genetic algorithm spending `num_shapelets / n` evaluations per series.
///
/// The fittest individual survives each generation unchanged. Offspring come
/// from two tournament winners, take each gene from either parent with equal
/// probability, then shift each gene by one with probability 1.5%. Offspring
/// that fall outside the series are replaced by random individuals.
pub struct GeneticSearch {
    core: SearchCore,
    cache: HashMap<(usize, usize, usize), f64>,
    accepted: Vec<Candidate>,
    spent: u64,
}

impl GeneticSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            cache: HashMap::new(),
            accepted: Vec::new(),
            spent: 0,
        }
    }

    /// Fitness of a window; each call spends one unit of budget even when cached.
    fn fitness(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
        length: usize,
        start: usize,
        dimension: usize,
    ) -> f64 {
        self.spent += 1;
        if let Some(&fitness) = self.cache.get(&(length, start, dimension)) {
            return fitness;
        }
        self.core.mark_visited(length, start, dimension);
        let fitness = match self.core.evaluate(evaluator, series, dimension, start, length) {
            Some(c) if !c.quality.is_nan() => {
                let q = c.quality;
                self.accepted.push(c);
                q
            }
            _ => f64::NEG_INFINITY,
        };
        self.cache.insert((length, start, dimension), fitness);
        fitness
    }

    fn random_individual(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Individual> {
        let (length, start, dimension) = self.core.random_window(series.len())?;
        let fitness = self.fitness(series, evaluator, length, start, dimension);
        Ok(Individual {
            length,
            start,
            dimension,
            fitness,
        })
    }

    fn tournament(&mut self, population: &[Individual]) -> Individual {
        let mut winner = population[self.core.rng.gen_range(0..population.len())];
        for _ in 1..TOURNAMENT_SIZE {
            let contender = population[self.core.rng.gen_range(0..population.len())];
            if contender.fitter_than(&winner) {
                winner = contender;
            }
        }
        winner
    }

    fn mutate_gene(&mut self, gene: usize) -> Option<usize> {
        if !self.core.rng.gen_bool(MUTATION_RATE) {
            return Some(gene);
        }
        if self.core.rng.gen_bool(0.5) {
            gene.checked_add(1)
        } else {
            gene.checked_sub(1)
        }
    }

    fn fittest(population: &[Individual]) -> Individual {
        population
            .iter()
            .copied()
            .fold(population[0], |best, i| if i.fitter_than(&best) { i } else { best })
    }

    /// Elite plus tournament offspring, stopping early once `budget` is spent.
    fn next_generation(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
        population: &[Individual],
        budget: u64,
    ) -> Result<Vec<Individual>> {
        let m = series.len();
        let size = population.len();
        let mut next = Vec::with_capacity(size.max(2));
        next.push(Self::fittest(population));
        let offspring = size.saturating_sub(1).max(1);
        for _ in 0..offspring {
            if self.spent >= budget {
                break;
            }
            let a = self.tournament(population);
            let b = self.tournament(population);
            let child = match self.breed(&a, &b) {
                Some((length, start, dimension)) if self.core.in_bounds(m, length, start, dimension) => {
                    let fitness = self.fitness(series, evaluator, length, start, dimension);
                    Individual {
                        length,
                        start,
                        dimension,
                        fitness,
                    }
                }
                _ => self.random_individual(series, evaluator)?,
            };
            next.push(child);
        }
        Ok(next)
    }

    /// Crossover then mutation; `None` when a gene leaves its domain.
    fn breed(&mut self, a: &Individual, b: &Individual) -> Option<(usize, usize, usize)> {
        let length = if self.core.rng.gen_bool(0.5) { a.length } else { b.length };
        let start = if self.core.rng.gen_bool(0.5) { a.start } else { b.start };
        let length = self.mutate_gene(length)?;
        let start = self.mutate_gene(start)?;
        Some((length, start, a.dimension))
    }
}

impl SearchStrategy for GeneticSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let summary = self.core.summary()?;
        let budget = self.core.config.num_shapelets / summary.num_series.max(1) as u64;
        self.cache.clear();
        self.accepted.clear();
        self.spent = 0;
        if budget == 0 {
            return Ok(Vec::new());
        }

        let size = (self.core.config.initial_population_size as u64).min(budget).max(1) as usize;
        let mut population = Vec::with_capacity(size);
        for _ in 0..size {
            population.push(self.random_individual(series, evaluator)?);
        }

        let mut generations = 0usize;
        while self.spent < budget {
            population = self.next_generation(series, evaluator, &population, budget)?;
            generations += 1;
        }

        debug!(
            series = series.index(),
            generations,
            accepted = self.accepted.len(),
            "Genetic search finished"
        );
        Ok(std::mem::take(&mut self.accepted))
    }

    fn search_type(&self) -> SearchType {
        SearchType::Genetic
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}
