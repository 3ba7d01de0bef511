//! Session phases and the transitions allowed between them.

/// Where the round is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Title screen, waiting for `start`.
    Start,
    Playing,
    Paused,
    Settings,
    /// Round over. Stays here until `reset`.
    GameOver,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Start => "start",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Settings => "settings",
            SessionState::GameOver => "game over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    TimeUp,
    /// Player health ran out.
    Eliminated,
}

/// Owns the current state. Refused transitions return `None` and change nothing.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SessionState,
    /// Where `close_settings` returns to.
    before_settings: Option<SessionState>,
    game_over: Option<GameOverReason>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self { state: SessionState::Start, before_settings: None, game_over: None }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.game_over
    }

    /// Movement, weapon, spawning and the timer run only here.
    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    /// Physics keeps stepping outside pause/settings so bodies settle on the
    /// title and results screens.
    pub fn physics_runs(&self) -> bool {
        matches!(self.state, SessionState::Start | SessionState::Playing | SessionState::GameOver)
    }

    fn go(&mut self, to: SessionState) -> Option<SessionState> {
        log::debug!("Session {} -> {}", self.state.name(), to.name());
        self.state = to;
        Some(to)
    }

    pub fn start(&mut self) -> Option<SessionState> {
        match self.state {
            SessionState::Start => self.go(SessionState::Playing),
            _ => None,
        }
    }

    pub fn pause(&mut self) -> Option<SessionState> {
        match self.state {
            SessionState::Playing => self.go(SessionState::Paused),
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<SessionState> {
        match self.state {
            SessionState::Paused => self.go(SessionState::Playing),
            _ => None,
        }
    }

    /// Settings open over play or the pause screen, never over the title or results.
    pub fn open_settings(&mut self) -> Option<SessionState> {
        match self.state {
            SessionState::Playing | SessionState::Paused => {
                self.before_settings = Some(self.state);
                self.go(SessionState::Settings)
            }
            _ => None,
        }
    }

    pub fn close_settings(&mut self) -> Option<SessionState> {
        match self.state {
            SessionState::Settings => {
                let back = self.before_settings.take().unwrap_or(SessionState::Paused);
                self.go(back)
            }
            _ => None,
        }
    }

    /// Enter GameOver from play. Only the first call succeeds.
    pub fn game_over(&mut self, reason: GameOverReason) -> Option<SessionState> {
        match self.state {
            SessionState::Playing => {
                self.game_over = Some(reason);
                self.go(SessionState::GameOver)
            }
            _ => None,
        }
    }

    /// Back to the title screen from anywhere.
    pub fn reset(&mut self) -> SessionState {
        self.before_settings = None;
        self.game_over = None;
        self.state = SessionState::Start;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_pause_and_resume() {
        let mut flow = StateMachine::new();
        assert_eq!(flow.pause(), None);
        assert_eq!(flow.start(), Some(SessionState::Playing));
        assert_eq!(flow.start(), None);
        assert_eq!(flow.pause(), Some(SessionState::Paused));
        assert!(!flow.is_playing());
        assert!(!flow.physics_runs());
        assert_eq!(flow.resume(), Some(SessionState::Playing));
    }

    #[test]
    fn settings_return_to_where_they_opened() {
        let mut flow = StateMachine::new();
        flow.start();
        flow.open_settings();
        assert_eq!(flow.pause(), None);
        assert_eq!(flow.close_settings(), Some(SessionState::Playing));

        flow.pause();
        flow.open_settings();
        assert_eq!(flow.close_settings(), Some(SessionState::Paused));
    }

    #[test]
    fn settings_refused_on_title_and_results() {
        let mut flow = StateMachine::new();
        assert_eq!(flow.open_settings(), None);
        flow.start();
        flow.game_over(GameOverReason::TimeUp);
        assert_eq!(flow.open_settings(), None);
        assert_eq!(flow.pause(), None);
    }

    #[test]
    fn game_over_is_entered_once() {
        let mut flow = StateMachine::new();
        flow.start();
        assert!(flow.game_over(GameOverReason::Eliminated).is_some());
        assert!(flow.game_over(GameOverReason::TimeUp).is_none());
        assert_eq!(flow.game_over_reason(), Some(GameOverReason::Eliminated));
        assert!(flow.physics_runs());

        assert_eq!(flow.reset(), SessionState::Start);
        assert_eq!(flow.game_over_reason(), None);
    }
}
