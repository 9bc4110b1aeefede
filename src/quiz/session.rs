//! Session lifecycle: roster, round sequencing, score and results ledger.

use rand::Rng;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    catalog::{Catalog, HintLevel},
    quiz::{
        round::{RoundState, RoundVerdict},
        selector::{self, SelectionError},
    },
};

/// One completed round, appended to the ledger and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    /// Round number, 1-based.
    pub round: usize,
    /// Entity that had to be identified.
    pub entity_id: String,
    /// Its canonical name.
    pub entity_name: String,
    /// Variant that was played.
    pub variant_id: String,
    /// Whether that variant is shared.
    pub shared: bool,
    /// Every guess submitted, skip markers included.
    pub guesses: Vec<String>,
    /// Whether the entity was found.
    pub correct: bool,
    /// Level at which it was found.
    pub hint_level: Option<HintLevel>,
    /// Points awarded.
    pub points: u32,
    /// Whether the shared-audio category rule accepted the answer.
    pub via_generic: bool,
    /// When the verdict was reached.
    pub completed_at: OffsetDateTime,
}

/// Rating of a finished session, from its score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    /// 90 % and above.
    EntityPleased,
    /// 70 % and above.
    MercilessKiller,
    /// 50 % and above.
    BrutalKiller,
    /// 30 % and above.
    RuthlessKiller,
    /// Below 30 %.
    EntityDispleased,
}

impl PerformanceTier {
    /// Tier matching a rounded percentage.
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Self::EntityPleased,
            70..=89 => Self::MercilessKiller,
            50..=69 => Self::BrutalKiller,
            30..=49 => Self::RuthlessKiller,
            _ => Self::EntityDispleased,
        }
    }
}

/// Summary shown once every round has been played.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsSummary {
    /// Total score.
    pub score: u32,
    /// Best achievable score.
    pub max_score: u32,
    /// Score over best score, rounded to the nearest percent.
    pub percentage: u32,
    /// Rounds won.
    pub correct_rounds: usize,
    /// Rating.
    pub tier: PerformanceTier,
    /// Ledger rows.
    pub rounds: Vec<RoundResult>,
}

/// Outcome of [`SessionState::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProgress {
    /// A new round was opened.
    NextRound(usize),
    /// The roster is exhausted.
    Finished,
}

/// State of one play-through.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Identifier used to discard deferred actions from earlier sessions.
    pub session_id: Uuid,
    roster: Vec<String>,
    round_index: usize,
    score: u32,
    ledger: Vec<RoundResult>,
    shared_variant_consumed: bool,
    round: RoundState,
    finished: bool,
}

impl SessionState {
    /// Draw a roster of `total_rounds` entities and open the first round.
    pub fn start<R>(
        catalog: &Catalog,
        total_rounds: usize,
        rng: &mut R,
    ) -> Result<Self, SelectionError>
    where
        R: Rng + ?Sized,
    {
        let roster = selector::build_roster(catalog, total_rounds, rng)?;
        let session_id = Uuid::new_v4();
        let mut shared_variant_consumed = false;
        let round = open_round(catalog, &roster, 1, &mut shared_variant_consumed, rng)?;

        info!(%session_id, rounds = roster.len(), "session started");

        Ok(Self {
            session_id,
            roster,
            round_index: 1,
            score: 0,
            ledger: Vec::new(),
            shared_variant_consumed,
            round,
            finished: false,
        })
    }

    /// Replace this session with a brand new one. Nothing carries over.
    pub fn restart<R>(&mut self, catalog: &Catalog, rng: &mut R) -> Result<(), SelectionError>
    where
        R: Rng + ?Sized,
    {
        let fresh = Self::start(catalog, self.total_rounds(), rng)?;
        debug!(previous = %self.session_id, next = %fresh.session_id, "session restarted");
        *self = fresh;
        Ok(())
    }

    /// Move past a completed round: open the next one or finish the session.
    pub fn advance<R>(
        &mut self,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<SessionProgress, SelectionError>
    where
        R: Rng + ?Sized,
    {
        if self.finished {
            return Ok(SessionProgress::Finished);
        }
        if self.round_index >= self.total_rounds() {
            self.finished = true;
            info!(session_id = %self.session_id, score = self.score, "session finished");
            return Ok(SessionProgress::Finished);
        }

        let number = self.round_index + 1;
        self.round = open_round(
            catalog,
            &self.roster,
            number,
            &mut self.shared_variant_consumed,
            rng,
        )?;
        self.round_index = number;
        Ok(SessionProgress::NextRound(number))
    }

    /// Append the verdict of the current round to the ledger and add its points.
    pub fn record(&mut self, catalog: &Catalog, verdict: RoundVerdict) -> &RoundResult {
        let round = &self.round;
        let entity_name = catalog
            .entity(&round.entity_id)
            .map(|entity| entity.name.clone())
            .unwrap_or_else(|| round.entity_id.clone());

        self.score += verdict.points;
        self.ledger.push(RoundResult {
            round: round.number,
            entity_id: round.entity_id.clone(),
            entity_name,
            variant_id: round.variant_id.clone(),
            shared: round.shared,
            guesses: round.guesses().to_vec(),
            correct: verdict.correct(),
            hint_level: verdict.level,
            points: verdict.points,
            via_generic: verdict.via_generic,
            completed_at: OffsetDateTime::now_utc(),
        });

        let recorded = &self.ledger[self.ledger.len() - 1];
        debug!(
            round = recorded.round,
            entity = %recorded.entity_id,
            correct = recorded.correct,
            points = recorded.points,
            "round recorded"
        );
        recorded
    }

    /// Summary of the ledger so far.
    pub fn summary(&self) -> ResultsSummary {
        let max_score = HintLevel::Far.points() * self.total_rounds() as u32;
        let percentage = if max_score == 0 {
            0
        } else {
            (f64::from(self.score) * 100.0 / f64::from(max_score)).round() as u32
        };

        ResultsSummary {
            score: self.score,
            max_score,
            percentage,
            correct_rounds: self.ledger.iter().filter(|result| result.correct).count(),
            tier: PerformanceTier::from_percentage(percentage),
            rounds: self.ledger.clone(),
        }
    }

    /// Entities of the session, in play order.
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Current round number, 1-based.
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// Rounds in the session.
    pub fn total_rounds(&self) -> usize {
        self.roster.len()
    }

    /// Cumulative score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Completed rounds.
    pub fn ledger(&self) -> &[RoundResult] {
        &self.ledger
    }

    /// Whether a shared variant has been played in this session.
    pub fn shared_variant_consumed(&self) -> bool {
        self.shared_variant_consumed
    }

    /// Whether the roster has been exhausted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Round being played.
    pub fn round(&self) -> &RoundState {
        &self.round
    }

    /// Mutable access to the round being played.
    pub fn round_mut(&mut self) -> &mut RoundState {
        &mut self.round
    }
}

fn open_round<R>(
    catalog: &Catalog,
    roster: &[String],
    number: usize,
    shared_variant_consumed: &mut bool,
    rng: &mut R,
) -> Result<RoundState, SelectionError>
where
    R: Rng + ?Sized,
{
    let entity_id = roster
        .get(number - 1)
        .ok_or_else(|| SelectionError::UnknownEntity(format!("round {number}")))?;
    let entity = catalog
        .entity(entity_id)
        .ok_or_else(|| SelectionError::UnknownEntity(entity_id.clone()))?;

    let choice = selector::choose_variant(catalog, entity, *shared_variant_consumed, rng)?;
    if choice.shared {
        *shared_variant_consumed = true;
    }

    debug!(
        round = number,
        entity = %entity.id,
        variant = %choice.variant_id,
        shared = choice.shared,
        "round opened"
    );

    Ok(RoundState::new(
        number,
        entity.id.clone(),
        choice.variant_id,
        choice.shared,
    ))
}
