use std::sync::Arc;

use eframe::{egui, App, CreationContext, Frame};
use egui::{Align, Color32, DragValue, Layout, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use workout_tracker::{
    ClientConfig, CommitError, CommitPhase, CommitPipeline, CommittedWorkout, DraftStore,
    Exercise, ExerciseCatalog, FileStore, HttpBackend, PersistenceMirror, SetBuckets, SetField,
    StaticIdentity, WorkoutBackend, WorkoutSet,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("workout_tracker=info")),
        )
        .init();

    let config = ClientConfig::from_env()?;
    info!(api = %config.api_base_url, storage = %config.storage_dir.display(), "starting workout tracker");

    let runtime = Runtime::new()?;
    let backend: Arc<dyn WorkoutBackend> = Arc::new(HttpBackend::new(&config)?);
    let mirror = PersistenceMirror::new(Arc::new(FileStore::new(&config.storage_dir)));
    let draft = Arc::new(DraftStore::restore(mirror));
    let pipeline = Arc::new(CommitPipeline::new(
        draft.clone(),
        backend.clone(),
        Arc::new(StaticIdentity::new(config.user_id)),
    ));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 900.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Workout Tracker",
        options,
        Box::new(move |cc| Ok(Box::new(WorkoutApp::new(cc, runtime, backend, draft, pipeline)))),
    )?;
    Ok(())
}

enum Action {
    Rename(String),
    AddExercise(Exercise),
    RemoveExercise(i64),
    AddSet(i64),
    UpdateSet(i64, u32, SetField),
    RemoveSet(i64, u32),
    Finish,
    Cancel,
    RefreshCatalog,
    CreateExercise,
    DeleteExercise(i64),
}

struct StatusLine {
    text: String,
    is_error: bool,
}

#[derive(Default)]
struct NewExerciseForm {
    name: String,
    category: String,
}

struct WorkoutApp {
    runtime: Runtime,
    backend: Arc<dyn WorkoutBackend>,
    draft: Arc<DraftStore>,
    pipeline: Arc<CommitPipeline>,
    catalog: ExerciseCatalog,
    name_rx: watch::Receiver<String>,
    exercises_rx: watch::Receiver<Vec<Exercise>>,
    sets_rx: watch::Receiver<SetBuckets>,
    phase_rx: watch::Receiver<CommitPhase>,
    name_input: String,
    search: String,
    new_exercise: NewExerciseForm,
    status: Option<StatusLine>,
    pending_commit: Option<JoinHandle<Result<CommittedWorkout, CommitError>>>,
}

impl WorkoutApp {
    fn new(
        cc: &CreationContext,
        runtime: Runtime,
        backend: Arc<dyn WorkoutBackend>,
        draft: Arc<DraftStore>,
        pipeline: Arc<CommitPipeline>,
    ) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::new(18.0, egui::FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Heading,
            egui::FontId::new(28.0, egui::FontFamily::Proportional),
        );
        cc.egui_ctx.set_style(style);

        let restored = !draft.snapshot().is_empty();
        let mut app = WorkoutApp {
            runtime,
            backend,
            name_rx: draft.subscribe_name(),
            exercises_rx: draft.subscribe_exercises(),
            sets_rx: draft.subscribe_sets(),
            phase_rx: pipeline.subscribe_phase(),
            name_input: draft.name(),
            draft,
            pipeline,
            catalog: ExerciseCatalog::new(),
            search: String::new(),
            new_exercise: NewExerciseForm::default(),
            status: None,
            pending_commit: None,
        };

        app.refresh_catalog();
        if restored {
            app.set_info("Restored your unfinished workout.");
        }
        app
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine { text: text.into(), is_error: false });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine { text: text.into(), is_error: true });
    }

    fn refresh_catalog(&mut self) {
        let result = self.runtime.block_on(self.catalog.refresh(self.backend.as_ref()));
        if let Err(e) = result {
            error!(error = %e, "failed to load exercises");
            self.set_error(format!("Could not load exercises: {e}"));
        }
    }

    fn create_exercise(&mut self) {
        let name = self.new_exercise.name.trim().to_string();
        if name.is_empty() {
            self.set_error("Exercise name is required.");
            return;
        }
        let exercise = Exercise::new(name, self.new_exercise.category.trim());
        let result = self
            .runtime
            .block_on(self.catalog.create(self.backend.as_ref(), exercise));
        match result {
            Ok(created) => {
                self.new_exercise = NewExerciseForm::default();
                self.set_info(format!("Created {}.", created.name));
            }
            Err(e) => self.set_error(format!("Could not create exercise: {e}")),
        }
    }

    fn delete_exercise(&mut self, exercise_id: i64) {
        let result = self
            .runtime
            .block_on(self.catalog.delete(self.backend.as_ref(), exercise_id));
        if let Err(e) = result {
            self.set_error(format!("Could not delete exercise: {e}"));
        }
    }

    fn start_commit(&mut self) {
        if self.pending_commit.is_some() {
            return;
        }
        let pipeline = self.pipeline.clone();
        self.status = None;
        self.pending_commit = Some(self.runtime.spawn(async move { pipeline.commit().await }));
    }

    fn poll_commit(&mut self) {
        let finished = self
            .pending_commit
            .as_ref()
            .is_some_and(JoinHandle::is_finished);
        if !finished {
            return;
        }
        let Some(handle) = self.pending_commit.take() else {
            return;
        };
        match self.runtime.block_on(handle) {
            Ok(Ok(workout)) => self.set_info(format!(
                "Saved \"{}\" ({:.1} kg lifted).",
                workout.name, workout.total_weight
            )),
            Ok(Err(e)) => self.set_error(describe_commit_error(&e)),
            Err(e) => {
                error!(error = %e, "save task failed");
                self.set_error("Saving stopped unexpectedly. Your workout is still here.");
            }
        }
    }

    fn sync_name(&mut self) {
        if self.name_rx.has_changed().unwrap_or(false) {
            self.name_input = self.name_rx.borrow_and_update().clone();
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Rename(name) => self.draft.set_name(name),
            Action::AddExercise(exercise) => {
                if let Err(e) = self.draft.add_exercise(exercise) {
                    self.set_error(e.to_string());
                }
            }
            Action::RemoveExercise(id) => self.draft.remove_exercise(id),
            Action::AddSet(id) => self.draft.add_set(id),
            Action::UpdateSet(id, set_id, field) => self.draft.update_set(id, set_id, field),
            Action::RemoveSet(id, set_id) => self.draft.remove_set(id, set_id),
            Action::Finish => self.start_commit(),
            Action::Cancel => {
                self.pipeline.cancel();
                self.set_info("Workout discarded.");
            }
            Action::RefreshCatalog => self.refresh_catalog(),
            Action::CreateExercise => self.create_exercise(),
            Action::DeleteExercise(id) => self.delete_exercise(id),
        }
    }
}

impl App for WorkoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_commit();
        self.sync_name();

        let mut actions = Vec::new();

        egui::SidePanel::left("exercise_catalog")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.show_catalog(ui, &mut actions));

        egui::CentralPanel::default().show(ctx, |ui| self.show_draft(ui, &mut actions));

        for action in actions {
            self.apply(action);
        }

        if self.pending_commit.is_some() {
            ctx.request_repaint();
        }
    }
}

impl WorkoutApp {
    fn show_catalog(&mut self, ui: &mut Ui, actions: &mut Vec<Action>) {
        ui.add_space(10.0);
        ui.label(RichText::new("Exercises").heading().strong());

        ui.horizontal(|ui| {
            ui.label("Search");
            ui.text_edit_singleline(&mut self.search);
            if ui.button("Refresh").clicked() {
                actions.push(Action::RefreshCatalog);
            }
        });
        let categories = self.catalog.categories().join(", ");
        if !categories.is_empty() {
            ui.label(RichText::new(categories).color(Color32::GRAY).size(14.0));
        }
        ui.separator();

        ScrollArea::vertical().max_height(520.0).show(ui, |ui| {
            ui.set_width(ui.available_width());
            for exercise in self.catalog.search(&self.search) {
                let Some(id) = exercise.id else {
                    continue;
                };
                ui.horizontal(|ui| {
                    ui.label(RichText::new(&exercise.name).strong());
                    if !exercise.category.is_empty() {
                        ui.label(RichText::new(&exercise.category).color(Color32::GRAY));
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.small_button("Delete").clicked() {
                            actions.push(Action::DeleteExercise(id));
                        }
                        if ui.button("Add").clicked() {
                            actions.push(Action::AddExercise(exercise.clone()));
                        }
                    });
                });
            }
        });

        ui.separator();
        ui.label(RichText::new("New exercise").strong());
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut self.new_exercise.name);
        });
        ui.horizontal(|ui| {
            ui.label("Category");
            ui.text_edit_singleline(&mut self.new_exercise.category);
        });
        if ui.button("Create").clicked() {
            actions.push(Action::CreateExercise);
        }
    }

    fn show_draft(&mut self, ui: &mut Ui, actions: &mut Vec<Action>) {
        let phase = *self.phase_rx.borrow();
        let exercises = self.exercises_rx.borrow().clone();
        let sets = self.sets_rx.borrow().clone();

        ui.add_space(10.0);
        ui.label(RichText::new("Current Workout").heading().size(36.0).strong());
        ui.horizontal(|ui| {
            ui.label("Name");
            if ui.text_edit_singleline(&mut self.name_input).changed() {
                actions.push(Action::Rename(self.name_input.clone()));
            }
        });
        ui.add_space(10.0);

        if exercises.is_empty() {
            ui.label(RichText::new("Add an exercise from the list to get started.").size(20.0));
        }

        ScrollArea::vertical().max_height(560.0).show(ui, |ui| {
            ui.set_width(ui.available_width());
            for exercise in &exercises {
                let Some(id) = exercise.id else {
                    continue;
                };
                let bucket = sets.get(&id).map(Vec::as_slice).unwrap_or_default();
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&exercise.name).size(24.0).strong());
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.button("Remove").clicked() {
                                actions.push(Action::RemoveExercise(id));
                            }
                        });
                    });
                    ui.push_id(id, |ui| show_sets(ui, id, bucket, actions));
                    if ui.button("+ Add set").clicked() {
                        actions.push(Action::AddSet(id));
                    }
                });
                ui.add_space(8.0);
            }
        });

        ui.separator();
        let volume: f64 = sets.values().flatten().map(WorkoutSet::volume).sum();
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Total: {volume:.1} kg")).size(22.0).strong());
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.button("Cancel").clicked() {
                    actions.push(Action::Cancel);
                }
                let finish = egui::Button::new(RichText::new("Finish workout").size(22.0));
                if ui.add_enabled(!phase.is_running(), finish).clicked() {
                    actions.push(Action::Finish);
                }
            });
        });

        match phase {
            CommitPhase::Validating | CommitPhase::CreatingWorkout => {
                ui.label("Saving workout...");
            }
            CommitPhase::SavingSets { saved, total } => {
                ui.label(format!("Saving sets {saved} of {total}..."));
            }
            CommitPhase::Idle | CommitPhase::Done => {}
        }

        if let Some(status) = &self.status {
            let color = if status.is_error { Color32::RED } else { Color32::GREEN };
            ui.label(RichText::new(&status.text).color(color).size(20.0));
        }
    }
}

fn show_sets(ui: &mut Ui, exercise_id: i64, sets: &[WorkoutSet], actions: &mut Vec<Action>) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::exact(48.0))
        .column(Column::initial(140.0))
        .column(Column::initial(120.0))
        .column(Column::remainder())
        .header(24.0, |mut header| {
            header.col(|ui| {
                ui.strong("Set");
            });
            header.col(|ui| {
                ui.strong("Weight");
            });
            header.col(|ui| {
                ui.strong("Reps");
            });
            header.col(|_| {});
        })
        .body(|mut body| {
            for set in sets {
                body.row(28.0, |mut row| {
                    row.col(|ui| {
                        ui.label(set.set_id.to_string());
                    });
                    row.col(|ui| {
                        let mut weight = set.weight;
                        let editor = DragValue::new(&mut weight)
                            .range(0.0..=1000.0)
                            .speed(0.5)
                            .suffix(" kg");
                        if ui.add(editor).changed() {
                            actions.push(Action::UpdateSet(exercise_id, set.set_id, SetField::Weight(weight)));
                        }
                    });
                    row.col(|ui| {
                        let mut reps = set.reps;
                        if ui.add(DragValue::new(&mut reps).range(0..=1000)).changed() {
                            actions.push(Action::UpdateSet(exercise_id, set.set_id, SetField::Reps(reps)));
                        }
                    });
                    row.col(|ui| {
                        if ui.small_button("Remove").clicked() {
                            actions.push(Action::RemoveSet(exercise_id, set.set_id));
                        }
                    });
                });
            }
        });
}

fn describe_commit_error(error: &CommitError) -> String {
    match error {
        CommitError::Validation(e) => format!("Can't finish yet: {e}."),
        CommitError::Unauthenticated => "Sign in before saving a workout.".to_string(),
        CommitError::InProgress => "Already saving, hang on.".to_string(),
        CommitError::Network(e) => format!("Could not save the workout: {e}. Try again."),
        CommitError::ResponseShape { .. } => {
            "The workout may have been saved, but the server reply was not understood. Check your history before retrying.".to_string()
        }
        CommitError::PartialSave { saved, total, .. } => format!(
            "The workout was saved but only {saved} of {total} sets were. Retrying will save it again."
        ),
    }
}
