//! Session normalization and the forward-only active session cursor.

use crate::DrinkingSession;
use chrono::{DateTime, Utc};

/// Drinking sessions sorted ascending by start time
#[derive(Clone, Debug)]
pub struct SessionSchedule<'a> {
    sessions: Vec<&'a DrinkingSession>,
}

impl<'a> SessionSchedule<'a> {
    /// Sort the given sessions by start. Equal starts keep their input order.
    pub fn new(sessions: &'a [DrinkingSession]) -> Self {
        let mut sorted: Vec<&DrinkingSession> = sessions.iter().collect();
        sorted.sort_by_key(|s| s.start);
        Self { sessions: sorted }
    }

    pub fn sessions(&self) -> &[&'a DrinkingSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start of the earliest session
    pub fn first_start(&self) -> Option<DateTime<Utc>> {
        self.sessions.first().map(|s| s.start)
    }

    /// Latest end across all sessions
    ///
    /// Not necessarily the end of the session that starts last: a long
    /// session can enclose later ones.
    pub fn last_end(&self) -> Option<DateTime<Utc>> {
        self.sessions.iter().map(|s| s.end).max()
    }

    pub fn cursor(&self) -> ActiveSessionCursor<'_, 'a> {
        ActiveSessionCursor {
            schedule: self,
            index: 0,
        }
    }
}

/// Index into a [`SessionSchedule`] that only ever moves forward
///
/// Once the cursor has passed a session it is never reactivated, so gaps
/// between sessions read as "no active session". A session that starts
/// before the current one ends is only picked up once the current one is
/// over, and whatever it scheduled before that point is never ingested.
#[derive(Debug)]
pub struct ActiveSessionCursor<'s, 'a> {
    schedule: &'s SessionSchedule<'a>,
    index: usize,
}

impl<'s, 'a> ActiveSessionCursor<'s, 'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Move past every session that has ended by `now`, stopping at the last one
    pub fn advance(&mut self, now: DateTime<Utc>) {
        let sessions = &self.schedule.sessions;
        while self.index + 1 < sessions.len() && now >= sessions[self.index].end {
            self.index += 1;
            tracing::trace!("Session cursor advanced to {}", self.index);
        }
    }

    /// Current session if it overlaps the step window `[from, to)`
    pub fn active(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<&'a DrinkingSession> {
        self.schedule
            .sessions
            .get(self.index)
            .copied()
            .filter(|s| s.overlaps(from, to))
    }
}
