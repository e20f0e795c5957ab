use serde::Serialize;
use sxbmon_transport::{SerialLink, TransportSession};
use tracing::{debug, info, warn};

use crate::board::{BoardInfo, Cpu};
use crate::config::SessionConfig;
use crate::engine::{CommandEngine, EngineStats, ExchangeState};
use crate::error::{Operation, Result, SessionError, ValidationError};
use crate::image::Image;
use crate::model::{validate_range, Address, MemoryBlock};
use crate::registers::{RegisterOverrides, RegisterSet, REGISTER_BLOCK_SIZE};

/// What a load placed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub sections: usize,
    pub bytes: usize,
    /// Entry point named by the image, if any.
    pub entry: Option<Address>,
}

/// A connection to one board.
///
/// Operations run strictly one at a time. After a link failure the
/// session is poisoned and every later call fails with
/// [`SessionError::Closed`]; open a new session to continue.
pub struct Session<L> {
    engine: CommandEngine<L>,
    board: BoardInfo,
    registers: Option<RegisterSet>,
    poisoned: bool,
}

impl<L: SerialLink> Session<L> {
    /// Take ownership of `link` and query the board information block.
    pub fn open(link: L, config: SessionConfig) -> Result<Self> {
        let mut engine = CommandEngine::new(TransportSession::new(link), config);
        let board = engine.board_info()?;
        info!(
            cpu = ?board.cpu,
            board_id = board.board_id,
            mon_ram = board.mon_ram,
            link = engine.link_name(),
            "session opened"
        );
        Ok(Self::from_parts(engine, board))
    }

    /// Take ownership of `link` using an already known board description.
    pub fn with_board_info(link: L, config: SessionConfig, board: BoardInfo) -> Self {
        let engine = CommandEngine::new(TransportSession::new(link), config);
        Self::from_parts(engine, board)
    }

    fn from_parts(engine: CommandEngine<L>, board: BoardInfo) -> Self {
        Self {
            engine,
            board,
            registers: None,
            poisoned: false,
        }
    }

    pub fn board_info(&self) -> &BoardInfo {
        &self.board
    }

    pub fn config(&self) -> &SessionConfig {
        self.engine.config()
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// State of the most recent exchange.
    pub fn exchange_state(&self) -> ExchangeState {
        self.engine.state()
    }

    /// Whether programs start in emulation mode.
    pub fn emulation(&self) -> bool {
        self.board.emulation(self.engine.config().native)
    }

    /// Whether an earlier link failure closed the session.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Re-query the board information block.
    pub fn refresh_board_info(&mut self) -> Result<&BoardInfo> {
        let board = self.run(|engine| engine.board_info())?;
        self.board = board;
        Ok(&self.board)
    }

    /// Read `length` bytes starting at `address`.
    pub fn read(&mut self, address: Address, length: usize) -> Result<MemoryBlock> {
        validate_range(address, length)?;
        debug!(%address, length, "read");
        self.run(|engine| engine.read(Operation::Read, address, length))
    }

    /// Write `data` starting at `address`.
    pub fn write(&mut self, address: Address, data: &[u8]) -> Result<()> {
        validate_range(address, data.len())?;
        debug!(%address, length = data.len(), "write");
        if self.touches_register_block(address, data.len()) {
            self.registers = None;
        }
        self.run(|engine| engine.write(Operation::Write, address, data, 0))
    }

    /// Load a WDC `Z` image (as produced with `-g`).
    pub fn load(&mut self, image: &[u8]) -> Result<LoadSummary> {
        let image = Image::parse(image)?;
        self.load_image(&image)
    }

    /// Load raw bytes at `address`.
    pub fn load_at(&mut self, address: Address, data: &[u8]) -> Result<LoadSummary> {
        let image = Image::raw(address, data.to_vec())?;
        self.load_image(&image)
    }

    /// Write every section of `image` in order.
    ///
    /// On failure the reported completed count is the offset within the
    /// concatenated section data.
    pub fn load_image(&mut self, image: &Image) -> Result<LoadSummary> {
        for section in &image.sections {
            validate_range(section.address, section.data.len())?;
        }
        if image
            .sections
            .iter()
            .any(|s| self.touches_register_block(s.address, s.data.len()))
        {
            self.registers = None;
        }

        let mut loaded = 0usize;
        for section in &image.sections {
            debug!(address = %section.address, length = section.data.len(), "load section");
            self.run(|engine| engine.write(Operation::Load, section.address, &section.data, loaded))?;
            loaded += section.data.len();
        }

        let summary = LoadSummary {
            sections: image.sections.len(),
            bytes: loaded,
            entry: image.entry,
        };
        info!(sections = summary.sections, bytes = summary.bytes, "image loaded");
        Ok(summary)
    }

    /// Start execution at `address`.
    ///
    /// Registers start from the last snapshot read or written through this
    /// session, or from the monitor's reset values. `overrides` are applied
    /// on top and PC is forced to `address`. The snapshot is discarded
    /// because the program changes the registers.
    pub fn execute(&mut self, address: Address, overrides: &RegisterOverrides) -> Result<()> {
        let block = self.board.register_block()?;
        let mut registers = self
            .registers
            .unwrap_or_else(|| RegisterSet::reset(self.emulation()));
        registers.apply(overrides);
        registers.pc = address.get();
        self.check_cpu(&registers)?;

        info!(%address, emulation = registers.emulation, "execute");
        self.registers = None;
        self.run(|engine| engine.execute(block, &registers))
    }

    /// Read the saved register block.
    pub fn get_registers(&mut self) -> Result<RegisterSet> {
        let block = self.board.register_block()?;
        let raw = self.run(|engine| engine.read(Operation::GetRegisters, block, REGISTER_BLOCK_SIZE))?;
        let registers = RegisterSet::from_bytes(raw.as_bytes())?;
        self.registers = Some(registers);
        Ok(registers)
    }

    /// Overwrite the saved register block.
    pub fn set_registers(&mut self, registers: &RegisterSet) -> Result<()> {
        let block = self.board.register_block()?;
        self.check_cpu(registers)?;
        self.registers = None;
        self.run(|engine| engine.write(Operation::SetRegisters, block, &registers.to_bytes(), 0))?;
        self.registers = Some(*registers);
        Ok(())
    }

    /// The last register snapshot read or written, if still valid.
    pub fn cached_registers(&self) -> Option<&RegisterSet> {
        self.registers.as_ref()
    }

    /// End the session and hand back the link.
    pub fn close(self) -> L {
        info!(stats = ?self.engine.stats(), "session closed");
        self.engine.into_transport().into_inner()
    }

    fn check_cpu(&self, registers: &RegisterSet) -> Result<()> {
        if self.board.cpu == Cpu::W65C02 && !registers.emulation {
            return Err(ValidationError::NativeModeUnsupported.into());
        }
        registers.check_widths(self.board.cpu)?;
        Ok(())
    }

    fn touches_register_block(&self, address: Address, len: usize) -> bool {
        let Ok(block) = self.board.register_block() else {
            return false;
        };
        let start = usize::from(address.get());
        let block_start = usize::from(block.get());
        start < block_start + REGISTER_BLOCK_SIZE && block_start < start + len
    }

    fn run<T>(&mut self, op: impl FnOnce(&mut CommandEngine<L>) -> Result<T>) -> Result<T> {
        if self.poisoned {
            return Err(SessionError::Closed);
        }
        let result = op(&mut self.engine);
        if let Err(err) = &result {
            if err.is_fatal() {
                warn!(error = %err, "link failed; session closed");
                self.poisoned = true;
                self.registers = None;
            }
        }
        result
    }
}

impl<L> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("board", &self.board)
            .field("engine", &self.engine)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}
