use log::{debug, info, warn};
use shared::{
    Avatar, DamageEvent, EntryMode, EntryOrchestrator, EntryReport, ExitPositionRecord,
    ImmunityCue, ImmunityWindow, IncomingDamage, LocalExitStore, ModMessage, PersistenceConfig,
    ProtocolError, SessionRestore, Tick, Vec2, Verdict, WorldGrid,
};

pub const MAX_LIFE: i32 = 100;

/// State owned by the avatar's own process: the avatar, its local exit record
/// and its spawn immunity window. None of it is ever sent to the host except
/// the avatar's position and liveness.
#[derive(Debug)]
pub struct LocalPlayer {
    pub avatar: Avatar,
    pub life: i32,
    tick: Tick,
    config: PersistenceConfig,
    orchestrator: EntryOrchestrator,
    mode: EntryMode,
    immunity: ImmunityWindow,
    local_exit: LocalExitStore,
    last_report: Option<EntryReport>,
}

impl LocalPlayer {
    pub fn new(name: &str, config: PersistenceConfig, local_exit: LocalExitStore) -> Self {
        Self {
            avatar: Avatar::new(name, Vec2::ZERO),
            life: MAX_LIFE,
            tick: 0,
            orchestrator: EntryOrchestrator::new(&config),
            mode: EntryMode::Disabled,
            config,
            immunity: ImmunityWindow::new(),
            local_exit,
            last_report: None,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn local_exit(&self) -> &LocalExitStore {
        &self.local_exit
    }

    pub fn last_report(&self) -> Option<EntryReport> {
        self.last_report
    }

    pub fn is_immune(&self) -> bool {
        self.immunity.is_active(self.tick)
    }

    pub fn immunity(&self) -> &ImmunityWindow {
        &self.immunity
    }

    /// Advances one simulation tick and feeds the immunity cue.
    pub fn advance(&mut self, cue: &mut dyn ImmunityCue) {
        self.tick += 1;
        self.immunity.emit_cue(self.tick, cue);
    }

    /// Runs entry processing when the avatar joins a world.
    ///
    /// In session mode the host's restore message may follow and re-enter
    /// with the session position; the local record is left untouched.
    pub fn enter_world<G: WorldGrid + ?Sized>(
        &mut self,
        grid: &G,
        session_available: bool,
    ) -> EntryReport {
        self.mode = EntryMode::resolve(&self.config, session_available);
        self.avatar.alive = true;
        self.life = MAX_LIFE;

        let report = match self.mode {
            EntryMode::Local => self.orchestrator.enter(
                &mut self.avatar,
                &mut self.immunity,
                &mut self.local_exit,
                grid,
                self.tick,
            ),
            EntryMode::Session | EntryMode::Disabled => self.orchestrator.enter(
                &mut self.avatar,
                &mut self.immunity,
                &mut SessionRestore::default(),
                grid,
                self.tick,
            ),
        };

        self.record(report)
    }

    /// Applies a mod message from the host. Pure with respect to its input
    /// bytes: the same message always leads to the same avatar state.
    pub fn handle_mod_message<G: WorldGrid + ?Sized>(
        &mut self,
        bytes: &[u8],
        grid: &G,
    ) -> Result<Option<EntryReport>, ProtocolError> {
        match ModMessage::decode(bytes)? {
            ModMessage::RestoreSavedPosition { x, y } => {
                if self.mode != EntryMode::Session {
                    warn!("Ignoring restore message outside session mode");
                    return Ok(None);
                }

                let mut source = SessionRestore::new(Vec2::new(x, y));
                let report = self.orchestrator.enter(
                    &mut self.avatar,
                    &mut self.immunity,
                    &mut source,
                    grid,
                    self.tick,
                );
                Ok(Some(self.record(report)))
            }
        }
    }

    /// Damage interception point. Blocked events leave no trace at all.
    pub fn on_damage(&mut self, incoming: IncomingDamage) -> Verdict {
        let event = DamageEvent::from(incoming);
        let verdict = self
            .immunity
            .intercept(self.tick, &event, &self.config.block);

        if verdict == Verdict::Allow {
            self.apply_damage(&event);
        }
        verdict
    }

    fn apply_damage(&mut self, event: &DamageEvent) {
        if !self.avatar.alive {
            return;
        }

        self.life -= event.base_amount;
        self.avatar.velocity = self.avatar.velocity.offset(event.knockback.x, event.knockback.y);
        debug!(
            "{} took {} damage from {:?}, {} life left",
            self.avatar.name, event.base_amount, event.source, self.life
        );

        if self.life <= 0 {
            self.life = 0;
            self.avatar.alive = false;
            info!("{} died", self.avatar.name);
        }
    }

    /// Captures the local exit record on departure, if local persistence is on.
    pub fn leave_world(&mut self) -> Option<ExitPositionRecord> {
        if !self.config.enable_local {
            return None;
        }
        self.local_exit.save(&self.avatar)
    }

    fn record(&mut self, report: EntryReport) -> EntryReport {
        if let Some(notice) = report.notice() {
            info!("Position {}", notice);
        }
        self.last_report = Some(report);
        report
    }
}
