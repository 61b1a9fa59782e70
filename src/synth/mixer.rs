use crate::{
    config::{EngineConfig, MixMode},
    dsp::mix::{normalize_mean, sum_in_place},
    graph::{
        operator::{sanitize_frequency, sanitize_volume},
        CellChange, ControlValues, OperatorMatrix, RenderCtx,
    },
};

/*
Mixer
=====

Once per buffer period the mixer renders the carrier (column 0) of every
active row and averages them:

    out = master_volume * mean(carrier[row] for active rows)

Rendering a carrier pulls in its whole modulation chain, so the mixer only
ever asks for column 0.

Grid mode
---------

The FM operator grid. A keyboard note retunes every active carrier to the
note frequency; modulators keep their own frequencies.

Additive mode
-------------

Rows are harmonic slots. Slot k plays

    frequency = base_frequency * 2^k
    volume    = master_volume / 2^k

Master volume is already inside each slot's volume, so the additive mean is
not multiplied by master volume again.
*/

pub struct Mixer {
    matrix: OperatorMatrix,
    mode: MixMode,
    master_volume: f32,
    note_frequency: Option<f32>,
    sample_rate: f32,
}

impl Mixer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            matrix: OperatorMatrix::new(config.rows, config.cols),
            mode: config.mode,
            master_volume: sanitize_volume(config.master_volume),
            note_frequency: None,
            sample_rate: config.sample_rate as f32,
        }
    }

    pub fn matrix(&self) -> &OperatorMatrix {
        &self.matrix
    }

    pub fn mode(&self) -> MixMode {
        self.mode
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn note_frequency(&self) -> Option<f32> {
        self.note_frequency
    }

    pub fn controls_mut(&mut self) -> &mut ControlValues {
        self.matrix.controls_mut()
    }

    /// Activate a cell and apply mode-specific carrier tuning.
    pub fn activate(&mut self, row: usize, col: usize) -> CellChange {
        let change = self.matrix.activate(row, col);
        if change == CellChange::Activated && col == 0 {
            self.tune_carrier(row);
        }
        change
    }

    pub fn deactivate(&mut self, row: usize, col: usize) -> CellChange {
        self.matrix.deactivate(row, col)
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = sanitize_volume(volume);
        if let MixMode::Additive { .. } = self.mode {
            self.retune_all();
        }
    }

    /// Apply a keyboard note.
    pub fn note_on(&mut self, frequency: f32) {
        let frequency = sanitize_frequency(frequency);
        match &mut self.mode {
            MixMode::Grid => self.note_frequency = Some(frequency),
            MixMode::Additive { base_frequency } => *base_frequency = frequency,
        }
        self.retune_all();
    }

    pub fn set_voice_frequency(&mut self, row: usize, frequency: f32) {
        self.matrix.set_carrier_frequency(row, frequency);
    }

    fn retune_all(&mut self) {
        for row in 0..self.matrix.rows() {
            self.tune_carrier(row);
        }
    }

    fn tune_carrier(&mut self, row: usize) {
        match self.mode {
            MixMode::Grid => {
                if let Some(frequency) = self.note_frequency {
                    self.matrix.set_carrier_frequency(row, frequency);
                }
            }
            MixMode::Additive { base_frequency } => {
                let harmonic = 2.0_f32.powi(row as i32);
                self.matrix
                    .set_carrier_frequency(row, base_frequency * harmonic);
                self.matrix
                    .set_carrier_volume(row, self.master_volume / harmonic);
            }
        }
    }

    /// Render one buffer period into `out`.
    ///
    /// With no active voice the output is silence.
    pub fn output(&mut self, out: &mut [f32]) {
        let len = out.len();
        let ctx = RenderCtx::new(self.sample_rate);

        self.matrix.begin_block();
        out.fill(0.0);

        let mut voices = 0;
        for row in 0..self.matrix.rows() {
            if !self.matrix.voice_active(row) {
                continue;
            }
            let voice = self.matrix.render_voice(row, &ctx, len);
            sum_in_place(out, voice);
            voices += 1;
        }

        let gain = match self.mode {
            MixMode::Grid => self.master_volume,
            MixMode::Additive { .. } => 1.0,
        };
        normalize_mean(out, voices, gain);
    }
}
