use egui::{Label, RichText, Sense};

use super::{RowHit, SelectionTree, GLYPH_DESELECTED, GLYPH_SELECTED};

/// Width of the tree indicator column left of the toggle cells. Clicks
/// landing here must never toggle anything.
const INDICATOR_WIDTH: f32 = 20.0;
const CHILD_INDENT: f32 = 24.0;

impl SelectionTree {
    /// Draw the tree and refresh the row layout used for hit-testing.
    /// Returns the pointer position if the primary button was clicked this
    /// frame; the caller resolves it through [`SelectionTree::click_at`].
    pub fn render(&mut self, ui: &mut egui::Ui) -> Option<egui::Pos2> {
        self.begin_layout();

        let rows = self.flattened_rows();
        let mut recorded = Vec::with_capacity(rows.len());
        for (id, depth) in rows {
            let is_group = self.is_group(id);
            let glyph = if self.renders_selected(id) {
                GLYPH_SELECTED
            } else {
                GLYPH_DESELECTED
            };
            let label = {
                let item = self.get(id).expect("flattened row ids are alive");
                format!("{} {}", glyph, item.label)
            };

            let fill = if is_group {
                // Shade folder rows like the original tree view does.
                ui.visuals().faint_bg_color
            } else {
                egui::Color32::TRANSPARENT
            };
            egui::Frame::none().fill(fill).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.add_space(INDICATOR_WIDTH + CHILD_INDENT * depth as f32);
                    let text = if is_group {
                        RichText::new(label).strong()
                    } else {
                        RichText::new(label)
                    };
                    let response = ui.add(Label::new(text).sense(Sense::click()));
                    recorded.push(RowHit {
                        rect: response.rect,
                        item: id,
                    });
                    ui.allocate_space(egui::vec2(ui.available_width(), 0.0));
                });
            });
        }
        for hit in recorded {
            self.record_row(hit);
        }

        ui.input(|i| {
            i.pointer
                .primary_clicked()
                .then(|| i.pointer.interact_pos())
                .flatten()
        })
    }
}
