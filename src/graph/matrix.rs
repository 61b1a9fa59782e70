use crate::{
    dsp::Shape,
    graph::operator::{ModulationSource, OperatorGraph, OperatorId, OscillatorParams, RenderCtx},
};

/*
Operator Matrix
===============

The matrix is a fixed grid of operators. Each ROW is an independent voice;
each COLUMN is one step deeper into that voice's modulation chain.

    col:      0          1          2          3
    row 0   [carrier] ◀─ [mod]   ◀─ [mod]      .
    row 1   [carrier]    .          .          .
    row 2     .          .          .          .

Column 0 is the carrier that reaches the mix. Column c (c > 0) modulates
column c-1 in the same row.

Rules
-----

1. A cell may only switch on if it is in column 0 or the cell to its left is
   already on. Chains never have holes.

2. Switching a cell on in column c > 0 links it as the modulator of column
   c-1, using the current modulation-index control as the depth.

3. Switching a cell off switches off everything to its right, and the cell to
   its left becomes a plain oscillator again.

4. Switching an already-on cell on again refreshes its frequency, volume and
   shape from the current controls and restarts its phase, but keeps the
   modulator chain hanging off it.

Rule 3 is what keeps a carrier from ever pointing at a modulator that has
been switched off.

Control Values
--------------

The matrix keeps the current control-surface values (frequency, volume,
shape, modulation index). Activation snapshots them into the cell; changing
them later does not retune cells already playing.
*/

/// Current control-surface values, snapshotted by each activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlValues {
    pub frequency: f32,
    pub volume: f32,
    pub shape: Shape,
    pub modulation_index: f32,
}

impl Default for ControlValues {
    fn default() -> Self {
        Self {
            frequency: 10.0,
            volume: 1.0,
            shape: Shape::Sine,
            modulation_index: 5.0,
        }
    }
}

impl ControlValues {
    pub fn oscillator(&self) -> OscillatorParams {
        OscillatorParams::new(self.frequency, self.volume, self.shape)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Inactive,
    Active,
}

/// Outcome of an activation or deactivation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellChange {
    /// Out of range, chain rule violated, or already inactive.
    Unchanged,
    Activated,
    /// `voice_stopped` is set when the carrier itself (column 0) went off.
    Deactivated { voice_stopped: bool },
}

pub struct OperatorMatrix {
    rows: usize,
    cols: usize,
    graph: OperatorGraph,
    states: Vec<CellState>,
    controls: ControlValues,
}

impl OperatorMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            graph: OperatorGraph::with_operators(rows * cols),
            states: vec![CellState::Inactive; rows * cols],
            controls: ControlValues::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn controls(&self) -> &ControlValues {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlValues {
        &mut self.controls
    }

    pub fn graph(&self) -> &OperatorGraph {
        &self.graph
    }

    #[inline]
    fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Operator handle for a cell. Every cell has a fixed operator.
    pub fn operator_id(&self, row: usize, col: usize) -> Option<OperatorId> {
        self.in_bounds(row, col)
            .then(|| OperatorId(self.index(row, col)))
    }

    pub fn state(&self, row: usize, col: usize) -> CellState {
        if self.in_bounds(row, col) {
            self.states[self.index(row, col)]
        } else {
            CellState::Inactive
        }
    }

    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.state(row, col) == CellState::Active
    }

    /// A voice is active when its carrier is.
    pub fn voice_active(&self, row: usize) -> bool {
        self.is_active(row, 0)
    }

    pub fn active_voices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rows).filter(|&row| self.voice_active(row))
    }

    /// Number of active cells in `row`; also the length of its chain.
    pub fn chain_len(&self, row: usize) -> usize {
        (0..self.cols).take_while(|&col| self.is_active(row, col)).count()
    }

    pub fn operator(&self, row: usize, col: usize) -> Option<&crate::graph::Operator> {
        self.operator_id(row, col).and_then(|id| self.graph.get(id))
    }

    /// Switch a cell on. See the module notes for the rules.
    pub fn activate(&mut self, row: usize, col: usize) -> CellChange {
        if !self.in_bounds(row, col) {
            log::debug!("activate ({row}, {col}) outside {}x{} grid", self.rows, self.cols);
            return CellChange::Unchanged;
        }
        if col > 0 && !self.is_active(row, col - 1) {
            log::debug!("activate ({row}, {col}) rejected: ({row}, {}) is inactive", col - 1);
            return CellChange::Unchanged;
        }

        let id = OperatorId(self.index(row, col));
        let was_active = self.is_active(row, col);

        if !was_active {
            self.graph.reset(id);
        }

        if col > 0 {
            let predecessor = OperatorId(self.index(row, col - 1));
            if let Err(err) = self
                .graph
                .set_modulator(predecessor, ModulationSource::Operator(id))
            {
                log::error!("activate ({row}, {col}): {err}");
                return CellChange::Unchanged;
            }
            if let Some(op) = self.graph.get_mut(predecessor) {
                op.set_modulation_index(self.controls.modulation_index);
            }
        }

        let params = self.controls.oscillator();
        if let Some(op) = self.graph.get_mut(id) {
            op.set_params(params);
            op.reset_phase();
        }

        let index = self.index(row, col);
        self.states[index] = CellState::Active;
        CellChange::Activated
    }

    /// Switch a cell off, along with everything deeper in its row.
    pub fn deactivate(&mut self, row: usize, col: usize) -> CellChange {
        if !self.is_active(row, col) {
            return CellChange::Unchanged;
        }

        // Deepest first, so no active cell ever points at a reset one
        for k in (col..self.cols).rev() {
            let index = self.index(row, k);
            if self.states[index] == CellState::Active {
                self.states[index] = CellState::Inactive;
                self.graph.reset(OperatorId(index));
            }
        }

        if col > 0 {
            self.graph
                .clear_modulator(OperatorId(self.index(row, col - 1)));
        }

        CellChange::Deactivated {
            voice_stopped: col == 0,
        }
    }

    /// Switch off every cell.
    pub fn clear(&mut self) {
        for row in 0..self.rows {
            self.deactivate(row, 0);
        }
    }

    /// Retune the carrier of `row`. Ignored if the voice is inactive.
    pub fn set_carrier_frequency(&mut self, row: usize, frequency: f32) {
        if self.voice_active(row) {
            let id = OperatorId(self.index(row, 0));
            if let Some(op) = self.graph.get_mut(id) {
                op.set_frequency(frequency);
            }
        }
    }

    /// Change the carrier volume of `row`. Ignored if the voice is inactive.
    pub fn set_carrier_volume(&mut self, row: usize, volume: f32) {
        if self.voice_active(row) {
            let id = OperatorId(self.index(row, 0));
            if let Some(op) = self.graph.get_mut(id) {
                op.set_volume(volume);
            }
        }
    }

    /// Start a new buffer period for every operator in the grid.
    pub fn begin_block(&mut self) {
        self.graph.begin_block();
    }

    /// Render the voice of `row` for the current buffer period.
    pub fn render_voice(&mut self, row: usize, ctx: &RenderCtx, len: usize) -> &[f32] {
        match self.operator_id(row, 0) {
            Some(id) => self.graph.render(id, ctx, len),
            None => &[],
        }
    }

    /// Verify the chain rules hold for every row.
    pub fn check_invariants(&self) -> Result<(), String> {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let id = OperatorId(self.index(row, col));
                let op = self
                    .graph
                    .get(id)
                    .ok_or_else(|| format!("cell ({row}, {col}) has no operator"))?;
                let active = self.is_active(row, col);
                let next_active = self.is_active(row, col + 1);

                if active && col > 0 && !self.is_active(row, col - 1) {
                    return Err(format!("cell ({row}, {col}) active with a gap before it"));
                }

                let expected = if active && next_active {
                    ModulationSource::Operator(OperatorId(self.index(row, col + 1)))
                } else {
                    ModulationSource::None
                };
                if op.modulator() != expected {
                    return Err(format!(
                        "cell ({row}, {col}) modulator is {:?}, expected {expected:?}",
                        op.modulator()
                    ));
                }

                if !active && op.shape() != Shape::Silence {
                    return Err(format!("inactive cell ({row}, {col}) is not silent"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> OperatorMatrix {
        OperatorMatrix::new(6, 6)
    }

    fn active_cells(m: &OperatorMatrix) -> Vec<(usize, usize)> {
        (0..m.rows())
            .flat_map(|r| (0..m.cols()).map(move |c| (r, c)))
            .filter(|&(r, c)| m.is_active(r, c))
            .collect()
    }

    #[test]
    fn starts_all_inactive() {
        let m = grid();
        assert!(active_cells(&m).is_empty());
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn activation_needs_left_neighbour() {
        let mut m = grid();
        assert_eq!(m.activate(0, 1), CellChange::Unchanged);
        assert_eq!(m.activate(0, 0), CellChange::Activated);
        assert_eq!(m.activate(0, 2), CellChange::Unchanged);
        assert_eq!(active_cells(&m), vec![(0, 0)]);
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn activation_links_predecessor() {
        let mut m = grid();
        m.controls_mut().modulation_index = 3.0;
        m.activate(2, 0);
        m.activate(2, 1);

        let carrier = m.operator(2, 0).unwrap();
        assert_eq!(
            carrier.modulator(),
            ModulationSource::Operator(m.operator_id(2, 1).unwrap())
        );
        assert_eq!(carrier.modulation_index(), 3.0);
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn activation_snapshots_controls() {
        let mut m = grid();
        m.controls_mut().frequency = 42.0;
        m.controls_mut().volume = 0.5;
        m.controls_mut().shape = Shape::Triangle;
        m.activate(1, 0);

        m.controls_mut().frequency = 99.0;
        let op = m.operator(1, 0).unwrap();
        assert_eq!(op.frequency(), 42.0);
        assert_eq!(op.volume(), 0.5);
        assert_eq!(op.shape(), Shape::Triangle);
    }

    #[test]
    fn deactivation_cascades_to_the_right() {
        let mut m = grid();
        for col in 0..4 {
            m.activate(0, col);
        }
        m.activate(1, 0);

        assert_eq!(
            m.deactivate(0, 1),
            CellChange::Deactivated {
                voice_stopped: false
            }
        );
        assert_eq!(active_cells(&m), vec![(0, 0), (1, 0)]);
        assert_eq!(m.operator(0, 0).unwrap().modulator(), ModulationSource::None);
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn deactivating_carrier_stops_voice() {
        let mut m = grid();
        m.activate(3, 0);
        m.activate(3, 1);
        assert_eq!(
            m.deactivate(3, 0),
            CellChange::Deactivated {
                voice_stopped: true
            }
        );
        assert!(!m.voice_active(3));
        assert_eq!(m.chain_len(3), 0);
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn deactivating_inactive_cell_is_noop() {
        let mut m = grid();
        assert_eq!(m.deactivate(0, 0), CellChange::Unchanged);
        m.activate(0, 0);
        assert_eq!(m.deactivate(0, 3), CellChange::Unchanged);
        assert_eq!(active_cells(&m), vec![(0, 0)]);
    }

    #[test]
    fn reactivating_carrier_keeps_chain() {
        let mut m = grid();
        m.controls_mut().modulation_index = 7.0;
        m.activate(0, 0);
        m.activate(0, 1);
        m.activate(0, 2);

        m.controls_mut().volume = 0.3;
        m.controls_mut().modulation_index = 1.0;
        assert_eq!(m.activate(0, 0), CellChange::Activated);

        let carrier = m.operator(0, 0).unwrap();
        assert_eq!(carrier.volume(), 0.3);
        assert_eq!(carrier.modulation_index(), 7.0);
        assert_eq!(m.chain_len(0), 3);
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn reactivating_modulator_relinks_and_keeps_its_chain() {
        let mut m = grid();
        m.activate(0, 0);
        m.activate(0, 1);
        m.activate(0, 2);

        m.controls_mut().frequency = 2.5;
        m.controls_mut().modulation_index = 9.0;
        m.activate(0, 1);

        let middle = m.operator(0, 1).unwrap();
        assert_eq!(middle.frequency(), 2.5);
        assert_eq!(
            middle.modulator(),
            ModulationSource::Operator(m.operator_id(0, 2).unwrap())
        );
        assert_eq!(m.operator(0, 0).unwrap().modulation_index(), 9.0);
        assert!(m.check_invariants().is_ok());
    }

    #[test]
    fn reactivation_restarts_phase() {
        let mut m = grid();
        m.controls_mut().frequency = 100.0;
        m.activate(0, 0);

        let ctx = RenderCtx::new(44_100.0);
        m.begin_block();
        m.render_voice(0, &ctx, 1000);
        assert!(m.operator(0, 0).unwrap().phase() > 0.0);

        m.activate(0, 0);
        assert_eq!(m.operator(0, 0).unwrap().phase(), 0.0);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut m = OperatorMatrix::new(2, 2);
        assert_eq!(m.activate(2, 0), CellChange::Unchanged);
        assert_eq!(m.activate(0, 2), CellChange::Unchanged);
        assert_eq!(m.deactivate(5, 5), CellChange::Unchanged);
        assert!(m.render_voice(9, &RenderCtx::new(44_100.0), 64).is_empty());
    }

    #[test]
    fn full_row_then_clear() {
        let mut m = grid();
        for row in 0..6 {
            for col in 0..6 {
                assert_eq!(m.activate(row, col), CellChange::Activated);
            }
        }
        assert!(m.check_invariants().is_ok());
        assert_eq!(m.active_voices().count(), 6);

        m.clear();
        assert!(active_cells(&m).is_empty());
        assert!(m.check_invariants().is_ok());
    }
}
