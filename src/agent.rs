/// Runtime position of the agent inside a `GridWorld`.
///
/// The trace always starts with a `None` sentinel followed by the initial
/// state, so consumers drawing the path can pair consecutive entries.
#[derive(Debug, Clone)]
pub struct Agent {
    state: usize,
    initial_state: usize,
    trace: Vec<Option<usize>>,
    reward: f64,
}

impl Agent {
    pub fn new(initial_state: usize) -> Self {
        Self {
            state: initial_state,
            initial_state,
            trace: vec![None, Some(initial_state)],
            reward: 0.0,
        }
    }

    pub fn state(&self) -> usize {
        self.state
    }

    pub fn trace(&self) -> &[Option<usize>] {
        &self.trace
    }

    /// Sum of the arrival rewards collected since the last reset.
    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub(crate) fn record(&mut self, state: usize, reward: f64) {
        self.state = state;
        self.reward += reward;
        self.trace.push(Some(state));
    }

    pub(crate) fn reset(&mut self) {
        self.state = self.initial_state;
        self.reward = 0.0;
        self.trace.clear();
        self.trace.push(None);
        self.trace.push(Some(self.initial_state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_truncates_trace_to_sentinel_and_start() {
        let mut agent = Agent::new(3);
        agent.record(4, 0.0);
        agent.record(9, -1.0);
        assert_eq!(agent.trace(), &[None, Some(3), Some(4), Some(9)]);
        assert_eq!(agent.reward(), -1.0);

        agent.reset();
        assert_eq!(agent.state(), 3);
        assert_eq!(agent.trace(), &[None, Some(3)]);
        assert_eq!(agent.reward(), 0.0);
    }
}
