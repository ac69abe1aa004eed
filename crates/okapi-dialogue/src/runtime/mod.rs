//! The conversation state machine.
//!
//! A [`DialogueRuntime`] owns the loaded [`DialogueData`] stores, a
//! [`DisplaySurface`], the script variables and the [`CommandTable`]. At most
//! one dialogue is active at a time. The host drives it with
//! [`start_conversation`](DialogueRuntime::start_conversation) and
//! [`continue_dialogue`](DialogueRuntime::continue_dialogue); nothing happens
//! between calls.

mod commands;
mod config;
mod display;
mod events;
mod state;

pub use commands::{ArgValue, CommandError, CommandResult, CommandScope, CommandTable, Param, ParamKind};
pub use config::RuntimeConfig;
pub use display::{DisplaySurface, InputAxis};
pub use events::DialogueEvent;
pub use state::SeenDialogues;

use okapi_expr::{DataType, Expression, Value, VariableSink, Variables};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, warn};

use crate::error::{DialogueError, DialogueResult};
use crate::model::{CodeElem, CodeKind, Dialogue, DialogueElement, NextStep};
use crate::store::DialogueData;
use commands::ScopeRequest;

/// The dialogue currently shown.
#[derive(Debug, Clone)]
struct ActiveDialogue {
    store: usize,
    dialogue: usize,
    key: String,
    /// `None` until the first element is shown.
    index: Option<usize>,
}

/// What [`DialogueRuntime::step`] decided to do next.
enum Step {
    End,
    Show(usize),
    PickRandom(usize),
    Choose(String),
    Exhausted,
}

/// Drives conversations over a set of dialogue stores.
pub struct DialogueRuntime<D: DisplaySurface> {
    config: RuntimeConfig,
    stores: Vec<DialogueData>,
    display: D,
    variables: Variables,
    commands: CommandTable,
    seen: SeenDialogues,
    events: Vec<DialogueEvent>,
    rng: StdRng,
    active: Option<ActiveDialogue>,
    redirect_depth: usize,
}

impl<D: DisplaySurface> std::fmt::Debug for DialogueRuntime<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueRuntime")
            .field("stores", &self.stores.len())
            .field("active", &self.current_key())
            .field("events", &self.events.len())
            .finish()
    }
}

impl<D: DisplaySurface> DialogueRuntime<D> {
    /// Create a runtime with no data loaded.
    pub fn new(display: D, config: RuntimeConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            stores: Vec::new(),
            display,
            variables: Variables::new(),
            commands: CommandTable::new(),
            seen: SeenDialogues::new(),
            events: Vec::new(),
            rng,
            active: None,
            redirect_depth: 0,
        }
    }

    /// Register a store. Earlier stores win when keys collide.
    pub fn add_data(&mut self, data: DialogueData) {
        debug!(store = %data.name(), dialogues = data.len(), "dialogue data registered");
        self.stores.push(data);
    }

    /// Registered stores in registration order.
    pub fn data(&self) -> &[DialogueData] {
        &self.stores
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Script variables.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Mutable script variables.
    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    /// Commands callable from inline code.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Mutable command table, for registering commands.
    pub fn commands_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    /// The display surface.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Mutable display surface.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Start counts per dialogue key.
    pub fn seen(&self) -> &SeenDialogues {
        &self.seen
    }

    /// Replace the start counts, e.g. from a save game.
    pub fn restore_seen(&mut self, seen: SeenDialogues) {
        self.seen = seen;
    }

    /// Forget all start counts, re-enabling one-shot dialogues.
    pub fn reset_seen(&mut self) {
        self.seen.reset();
    }

    /// How many times `key` has been started.
    pub fn times_seen(&self, key: &str) -> u32 {
        self.seen.times_seen(key)
    }

    /// Whether `key` has been started at least once.
    pub fn has_said_dialogue(&self, key: &str) -> bool {
        self.seen.has_seen(key)
    }

    /// Events recorded since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[DialogueEvent] {
        &self.events
    }

    /// Drain recorded events.
    pub fn take_events(&mut self) -> Vec<DialogueEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether a conversation is active.
    pub fn is_talking(&self) -> bool {
        self.active.is_some()
    }

    /// Key the active dialogue was started with.
    pub fn current_key(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.key.as_str())
    }

    /// The active dialogue.
    pub fn current_dialogue(&self) -> Option<&Dialogue> {
        self.active
            .as_ref()
            .map(|a| &self.stores[a.store].dialogues()[a.dialogue])
    }

    /// The element currently shown.
    pub fn current_element(&self) -> Option<&DialogueElement> {
        let active = self.active.as_ref()?;
        self.current_dialogue()?.elements.get(active.index?)
    }

    /// Start the dialogue with `key`, ending any other active one.
    ///
    /// Returns `Ok(false)` when the key is unknown, the dialogue is one-shot and
    /// was already started, or it ended immediately without showing anything.
    pub fn start_conversation(&mut self, key: &str) -> DialogueResult<bool> {
        self.redirect_depth = 0;
        self.start(key)
    }

    /// End the active conversation and clear the display.
    pub fn end_conversation(&mut self) {
        self.display.clear();
        if let Some(active) = self.active.take() {
            debug!(key = %active.key, "conversation ended");
            self.events.push(DialogueEvent::Ended);
        }
    }

    /// Player confirmation: finish the text reveal, or advance if it is done.
    pub fn continue_dialogue(&mut self) -> DialogueResult<()> {
        if self.display.is_displaying() {
            self.display.skip();
            return Ok(());
        }
        self.advance()
    }

    /// Move to the next element, option target or exit transition.
    pub fn advance(&mut self) -> DialogueResult<()> {
        self.redirect_depth = 0;
        self.step()
    }

    /// Forward navigation input to the display surface.
    pub fn set_input(&mut self, input: InputAxis) {
        self.display.set_input(input);
    }

    /// Whether advancing would show something more rather than close.
    pub fn has_more_text(&self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        let dialogue = &self.stores[active.store].dialogues()[active.dialogue];

        let current = active.index.and_then(|i| dialogue.elements.get(i));
        if current.is_some_and(DialogueElement::has_options) {
            return true;
        }
        if dialogue.is_random() && !dialogue.elements.is_empty() {
            return false;
        }
        if active.index.map_or(0, |i| i + 1) < dialogue.elements.len() {
            return true;
        }
        matches!(self.select_next(dialogue), Some(NextStep::Key(key)) if !key.is_empty())
    }

    /// Whether `key` could be started now, following pure redirect dialogues.
    pub fn has_dialogue(&self, key: &str) -> bool {
        let mut current = key;
        for _ in 0..=self.config.max_redirect_depth {
            let Some((store, slot)) = self.locate(current) else {
                return false;
            };
            let dialogue = &self.stores[store].dialogues()[slot];
            if dialogue.is_one_shot() && self.seen.has_seen(current) {
                return false;
            }
            if !dialogue.is_redirect() {
                return true;
            }
            match self.select_next(dialogue) {
                Some(NextStep::Key(next)) => current = next.as_str(),
                _ => return false,
            }
        }
        warn!(key, "redirect limit reached while resolving dialogue");
        false
    }

    fn locate(&self, key: &str) -> Option<(usize, usize)> {
        self.stores
            .iter()
            .enumerate()
            .find_map(|(store, data)| data.position(key).map(|slot| (store, slot)))
    }

    fn start(&mut self, key: &str) -> DialogueResult<bool> {
        let Some((store, slot)) = self.locate(key) else {
            warn!(key, "cannot start conversation: dialogue not found");
            return Ok(false);
        };
        if self.stores[store].dialogues()[slot].is_one_shot() && self.seen.has_seen(key) {
            debug!(key, "one-shot dialogue already seen");
            return Ok(false);
        }

        let same = self
            .active
            .as_ref()
            .is_some_and(|a| a.store == store && a.dialogue == slot);
        if !same && self.active.is_some() {
            self.end_conversation();
        }

        self.active = Some(ActiveDialogue {
            store,
            dialogue: slot,
            key: key.to_string(),
            index: None,
        });
        let count = self.seen.mark_seen(key);
        self.events.push(DialogueEvent::Started { key: key.to_string() });
        debug!(key, count, "conversation started");

        self.step()?;
        Ok(self.active.is_some())
    }

    /// Follow a transition, bounded by the redirect limit.
    fn redirect(&mut self, key: &str) -> DialogueResult<bool> {
        if self.redirect_depth >= self.config.max_redirect_depth {
            warn!(
                key,
                limit = self.config.max_redirect_depth,
                "redirect limit reached, ending conversation"
            );
            self.end_conversation();
            return Ok(false);
        }
        self.redirect_depth += 1;
        self.start(key)
    }

    fn step(&mut self) -> DialogueResult<()> {
        let step = match &self.active {
            None => Step::End,
            Some(active) => {
                let dialogue = &self.stores[active.store].dialogues()[active.dialogue];
                let current = active.index.and_then(|i| dialogue.elements.get(i));

                if let Some(element) = current.filter(|e| e.has_options()) {
                    let selected = self.display.selected_option();
                    match element.options.get(selected) {
                        Some(option) => Step::Choose(option.key.clone()),
                        None => {
                            warn!(
                                key = %active.key,
                                selected,
                                options = element.options.len(),
                                "selected option out of range"
                            );
                            Step::End
                        }
                    }
                } else if dialogue.is_random() && !dialogue.elements.is_empty() {
                    match active.index {
                        None => Step::PickRandom(dialogue.elements.len()),
                        Some(_) => Step::End,
                    }
                } else {
                    let next = active.index.map_or(0, |i| i + 1);
                    if next < dialogue.elements.len() {
                        Step::Show(next)
                    } else {
                        Step::Exhausted
                    }
                }
            }
        };

        match step {
            Step::End => self.end_conversation(),
            Step::Show(index) => self.show(index),
            Step::PickRandom(len) => {
                let index = self.rng.random_range(0..len);
                self.show(index);
            }
            Step::Choose(key) => {
                if !self.redirect(&key)? {
                    self.end_conversation();
                }
            }
            Step::Exhausted => self.exhausted()?,
        }
        Ok(())
    }

    fn show(&mut self, index: usize) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.index = Some(index);
        if let Some(element) = self.stores[active.store].dialogues()[active.dialogue]
            .elements
            .get(index)
        {
            self.display.display(element);
        }
    }

    /// First transition whose condition holds, in declaration order.
    fn select_next<'d>(&self, dialogue: &'d Dialogue) -> Option<&'d NextStep> {
        dialogue
            .conditional_next
            .iter()
            .find(|next| self.condition_holds(&dialogue.name, &next.condition))
            .map(|next| &next.next)
    }

    fn condition_holds(&self, dialogue: &str, condition: &str) -> bool {
        if condition.trim().is_empty() {
            return true;
        }
        match Expression::parse(condition).and_then(|expr| expr.evaluate_bool(&self.variables)) {
            Ok(holds) => holds,
            Err(err) => {
                warn!(dialogue, condition, "condition treated as false: {err}");
                false
            }
        }
    }

    fn exhausted(&mut self) -> DialogueResult<()> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let (store, slot) = (active.store, active.dialogue);
        let dialogue = &self.stores[store].dialogues()[slot];
        let name = dialogue.name.clone();

        match self.select_next(dialogue).cloned() {
            None => self.end_conversation(),
            Some(NextStep::Key(key)) => {
                if !self.redirect(&key)? {
                    self.end_conversation();
                }
            }
            Some(NextStep::Code(code)) => {
                for elem in &code {
                    if let Err(err) = self.execute(&name, elem) {
                        self.end_conversation();
                        return Err(err);
                    }
                }
                let unchanged = self
                    .active
                    .as_ref()
                    .is_some_and(|a| a.store == store && a.dialogue == slot);
                if unchanged {
                    self.end_conversation();
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, dialogue: &str, elem: &CodeElem) -> DialogueResult<()> {
        match elem.kind {
            CodeKind::Attribution => self.assign(dialogue, elem),
            CodeKind::FunctionCall => self.call(dialogue, elem),
        }
    }

    fn assign(&mut self, dialogue: &str, elem: &CodeElem) -> DialogueResult<()> {
        let Some(source) = elem.args.first() else {
            return Err(DialogueError::Script {
                dialogue: dialogue.to_string(),
                message: format!("assignment to \"{}\" has no expression", elem.name),
            });
        };
        let expr = match Expression::parse(source) {
            Ok(expr) => expr,
            Err(err) => {
                warn!(dialogue, variable = %elem.name, "assignment skipped: {err}");
                return Ok(());
            }
        };

        let value = if expr.data_type(&self.variables) == DataType::Bool {
            expr.evaluate_bool(&self.variables).map(Value::Bool)
        } else {
            expr.evaluate_number(&self.variables).map(Value::Number)
        };
        match value {
            Ok(value) => {
                debug!(dialogue, variable = %elem.name, %value, "variable assigned");
                self.variables.set_variable(&elem.name, value);
            }
            Err(err) => warn!(dialogue, variable = %elem.name, "assignment skipped: {err}"),
        }
        Ok(())
    }

    fn call(&mut self, dialogue: &str, elem: &CodeElem) -> DialogueResult<()> {
        let mut scope = CommandScope::new(&mut self.variables);
        let result = self.commands.call(&elem.name, &elem.args, &mut scope);
        let requests = scope.into_requests();

        if let Err(err) = result {
            error!(dialogue, command = %elem.name, "command failed: {err}");
            return Ok(());
        }

        for request in requests {
            match request {
                ScopeRequest::Start(key) => {
                    self.redirect(&key)?;
                }
                ScopeRequest::End => self.end_conversation(),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speaker::SpeakerRegistry;

    #[derive(Debug, Default)]
    struct TestDisplay {
        shown: Vec<DialogueElement>,
        clears: usize,
        skips: usize,
        displaying: bool,
        selected: usize,
        input: Option<InputAxis>,
    }

    impl TestDisplay {
        fn last_text(&self) -> Option<&str> {
            self.shown.last().map(|e| e.text.as_str())
        }
    }

    impl DisplaySurface for TestDisplay {
        fn display(&mut self, element: &DialogueElement) {
            self.shown.push(element.clone());
        }

        fn clear(&mut self) {
            self.clears += 1;
        }

        fn skip(&mut self) {
            self.skips += 1;
            self.displaying = false;
        }

        fn is_displaying(&self) -> bool {
            self.displaying
        }

        fn set_input(&mut self, input: InputAxis) {
            self.input = Some(input);
        }

        fn selected_option(&self) -> usize {
            self.selected
        }
    }

    fn data(source: &str) -> DialogueData {
        DialogueData::import("test", source, &SpeakerRegistry::implicit()).unwrap()
    }

    fn runtime(source: &str) -> DialogueRuntime<TestDisplay> {
        let mut runtime = DialogueRuntime::new(TestDisplay::default(), RuntimeConfig::new().with_seed(7));
        runtime.add_data(data(source));
        runtime
    }

    fn started(key: &str) -> DialogueEvent {
        DialogueEvent::Started { key: key.to_string() }
    }

    #[test]
    fn linear_flow() {
        let mut rt = runtime("# a\n[Bob]: Hi\n\n# nothing\n");

        assert!(rt.start_conversation("a").unwrap());
        assert!(rt.is_talking());
        assert_eq!(rt.display().shown.len(), 1);
        assert_eq!(rt.display().shown[0].speaker_name(), Some("Bob"));
        assert_eq!(rt.display().last_text(), Some("Hi"));
        assert_eq!(rt.current_element().map(|e| e.text.as_str()), Some("Hi"));

        rt.continue_dialogue().unwrap();
        assert!(!rt.is_talking());
        assert_eq!(rt.take_events(), vec![started("a"), DialogueEvent::Ended]);
        assert!(rt.events().is_empty());
    }

    #[test]
    fn elements_are_shown_in_order() {
        let mut rt = runtime("# a\n[Bob]: one\n\n[Bob]: two\n\n[Bob]: three\n");
        rt.start_conversation("a").unwrap();
        rt.continue_dialogue().unwrap();
        rt.continue_dialogue().unwrap();
        let texts: Vec<_> = rt.display().shown.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(rt.is_talking());
        rt.continue_dialogue().unwrap();
        assert!(!rt.is_talking());
    }

    #[test]
    fn unknown_key_does_not_start() {
        let mut rt = runtime("# a\n[Bob]: Hi\n");
        assert!(!rt.start_conversation("missing").unwrap());
        assert!(rt.events().is_empty());
        assert!(rt.display().shown.is_empty());
    }

    #[test]
    fn empty_dialogue_ends_immediately() {
        let mut rt = runtime("# nothing\n");
        assert!(!rt.start_conversation("nothing").unwrap());
        assert_eq!(rt.take_events(), vec![started("nothing"), DialogueEvent::Ended]);
    }

    const BRANCH: &str = "# q\n[Bob]: Ready?\n* Yes -> y\n* No -> n\n\n# y\n[Bob]: Great\n\n# n\n[Bob]: Pity\n";

    #[test]
    fn option_branch_follows_selection() {
        let mut rt = runtime(BRANCH);
        rt.start_conversation("q").unwrap();
        assert!(rt.has_more_text());

        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("y"));
        assert_eq!(rt.display().last_text(), Some("Great"));
        assert_eq!(
            rt.take_events(),
            vec![started("q"), DialogueEvent::Ended, started("y")]
        );
    }

    #[test]
    fn option_branch_second_choice() {
        let mut rt = runtime(BRANCH);
        rt.display_mut().selected = 1;
        rt.start_conversation("q").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("n"));
    }

    #[test]
    fn out_of_range_selection_ends() {
        let mut rt = runtime(BRANCH);
        rt.display_mut().selected = 5;
        rt.start_conversation("q").unwrap();
        rt.continue_dialogue().unwrap();
        assert!(!rt.is_talking());
    }

    #[test]
    fn option_to_missing_key_ends() {
        let mut rt = runtime("# q\n[Bob]: Go?\n* Yes -> nowhere\n");
        rt.start_conversation("q").unwrap();
        rt.continue_dialogue().unwrap();
        assert!(!rt.is_talking());
        assert_eq!(rt.take_events(), vec![started("q"), DialogueEvent::Ended]);
    }

    #[test]
    fn one_shot_starts_once() {
        let mut rt = runtime("# once\n{OneShot}\n[Bob]: Only once\n");
        assert!(rt.start_conversation("once").unwrap());
        rt.continue_dialogue().unwrap();
        rt.take_events();

        assert!(!rt.start_conversation("once").unwrap());
        assert!(rt.events().is_empty());
        assert_eq!(rt.times_seen("once"), 1);
        assert!(rt.has_said_dialogue("once"));

        rt.reset_seen();
        assert!(rt.start_conversation("once").unwrap());
    }

    #[test]
    fn restored_seen_table_blocks_one_shot() {
        let mut rt = runtime("# once\n{OneShot}\n[Bob]: Only once\n");
        let mut seen = SeenDialogues::new();
        seen.mark_seen("once");
        rt.restore_seen(seen);
        assert!(!rt.start_conversation("once").unwrap());
    }

    #[test]
    fn random_shows_one_element_uniformly() {
        let mut rt = runtime("# r\n{Random}\n[A]: 0\n\n[A]: 1\n\n[A]: 2\n\n[A]: 3\n");
        let mut counts = [0usize; 4];

        for _ in 0..1000 {
            let before = rt.display().shown.len();
            assert!(rt.start_conversation("r").unwrap());
            assert_eq!(rt.display().shown.len(), before + 1);
            assert!(!rt.has_more_text());

            let index: usize = rt.display().last_text().unwrap().parse().unwrap();
            counts[index] += 1;

            rt.continue_dialogue().unwrap();
            assert!(!rt.is_talking());
            assert_eq!(rt.display().shown.len(), before + 1);
        }

        for count in counts {
            assert!((150..350).contains(&count), "{counts:?}");
        }
    }

    #[test]
    fn first_true_condition_wins() {
        let mut rt = runtime(
            "# c\n[Bob]: x\n\n{false}=>A\n{true}=>B\n{true}=>C\n\n# A\n[Bob]: a\n\n# B\n[Bob]: b\n\n# C\n[Bob]: c\n",
        );
        for _ in 0..10 {
            rt.start_conversation("c").unwrap();
            rt.continue_dialogue().unwrap();
            assert_eq!(rt.current_key(), Some("B"));
        }
    }

    #[test]
    fn conditions_read_variables() {
        let source = "# c\n[Bob]: x\n\n{gold >= 10}=>rich\n=>poor\n\n# rich\n[Bob]: r\n\n# poor\n[Bob]: p\n";
        let mut rt = runtime(source);
        rt.variables_mut().set_variable("gold", Value::Number(12.0));
        rt.start_conversation("c").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("rich"));

        rt.variables_mut().set_variable("gold", Value::Number(3.0));
        rt.start_conversation("c").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("poor"));
    }

    #[test]
    fn undefined_variable_condition_is_false() {
        let mut rt = runtime("# c\n[Bob]: x\n\n{missing > 1}=>a\n=>b\n\n# a\n[Bob]: a\n\n# b\n[Bob]: b\n");
        rt.start_conversation("c").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("b"));
    }

    #[test]
    fn redirect_dialogue_starts_target() {
        let mut rt = runtime("# hub\n=>real\n\n# real\n[Bob]: hi\n");
        assert!(rt.start_conversation("hub").unwrap());
        assert_eq!(rt.current_key(), Some("real"));
        assert_eq!(
            rt.take_events(),
            vec![started("hub"), DialogueEvent::Ended, started("real")]
        );
    }

    #[test]
    fn restarting_same_dialogue_does_not_end_it() {
        let mut rt = runtime("# a\n[Bob]: again\n\n=>a\n");
        rt.start_conversation("a").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("a"));
        assert_eq!(rt.display().shown.len(), 2);
        assert_eq!(rt.take_events(), vec![started("a"), started("a")]);
        assert_eq!(rt.times_seen("a"), 2);
    }

    #[test]
    fn redirect_cycle_is_cut_off() {
        let mut rt = DialogueRuntime::new(
            TestDisplay::default(),
            RuntimeConfig::new().with_seed(1).with_max_redirect_depth(4),
        );
        rt.add_data(data("# x\n=>y\n\n# y\n=>x\n"));

        assert!(!rt.start_conversation("x").unwrap());
        assert!(!rt.is_talking());
        let starts = rt
            .events()
            .iter()
            .filter(|e| matches!(e, DialogueEvent::Started { .. }))
            .count();
        assert_eq!(starts, 5);
    }

    #[test]
    fn code_block_assigns_variables() {
        let mut rt = runtime("# a\n[Bob]: x\n\n=>{\n  gold = gold + 5;\n  happy = gold > 10;\n  name = \"Bob\";\n}\n");
        rt.variables_mut().set_variable("gold", Value::Number(8.0));
        rt.start_conversation("a").unwrap();
        rt.continue_dialogue().unwrap();

        assert_eq!(rt.variables().get("gold"), Some(&Value::Number(13.0)));
        assert_eq!(rt.variables().get("happy"), Some(&Value::Bool(true)));
        assert_eq!(rt.variables().get("name"), None);
        assert!(!rt.is_talking());
    }

    #[test]
    fn missing_command_logs_and_ends() {
        let mut rt = runtime("# m\n[Bob]: x\n\n{}=>{ foo(); after = 1; }\n");
        rt.start_conversation("m").unwrap();
        rt.continue_dialogue().unwrap();

        assert!(!rt.is_talking());
        assert_eq!(rt.variables().get("after"), Some(&Value::Number(1.0)));
        assert_eq!(rt.take_events(), vec![started("m"), DialogueEvent::Ended]);
    }

    #[test]
    fn assignment_without_expression_is_script_error() {
        let mut rt = runtime("# s\n[Bob]: x\n\n=>{\nflag =;\n}\n");
        rt.start_conversation("s").unwrap();
        let err = rt.continue_dialogue().unwrap_err();
        assert!(matches!(err, DialogueError::Script { ref dialogue, .. } if dialogue == "s"));
        assert!(!rt.is_talking());
    }

    #[test]
    fn commands_receive_coerced_arguments() {
        let mut rt = runtime("# a\n[Bob]: x\n\n=>{ give(\"coin\", gold * 2); }\n");
        rt.commands_mut().register(
            "give",
            vec![Param::string("item"), Param::int("count")],
            |scope, args| {
                let item = args[0].as_str().unwrap_or_default().to_string();
                let count = args[1].as_int().unwrap_or_default();
                scope
                    .variables_mut()
                    .set_variable(&item, Value::Number(count as f64));
                Ok(())
            },
        );
        rt.variables_mut().set_variable("gold", Value::Number(3.0));
        rt.start_conversation("a").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.variables().get("coin"), Some(&Value::Number(6.0)));
    }

    #[test]
    fn command_can_start_another_dialogue() {
        let mut rt = runtime("# a\n[Bob]: x\n\n=>{ goto(\"b\"); }\n\n# b\n[Bob]: in b\n");
        rt.commands_mut()
            .register("goto", vec![Param::string("key")], |scope, args| {
                scope.start_conversation(args[0].as_str().unwrap_or_default());
                Ok(())
            });

        rt.start_conversation("a").unwrap();
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("b"));
        assert_eq!(rt.display().last_text(), Some("in b"));
        assert_eq!(
            rt.take_events(),
            vec![started("a"), DialogueEvent::Ended, started("b")]
        );
    }

    #[test]
    fn command_can_end_conversation() {
        let mut rt = runtime("# a\n[Bob]: x\n\n=>{ bye(); }\n");
        rt.commands_mut().register("bye", Vec::new(), |scope, _| {
            scope.end_conversation();
            Ok(())
        });
        rt.start_conversation("a").unwrap();
        rt.continue_dialogue().unwrap();
        assert!(!rt.is_talking());
        assert_eq!(rt.take_events(), vec![started("a"), DialogueEvent::Ended]);
    }

    #[test]
    fn has_dialogue_follows_redirects() {
        let mut rt = runtime(
            "# hub\n=>real\n\n# real\n{OneShot}\n[Bob]: hi\n\n# dead\n\n# loop\n=>loop\n\n# coded\n=>{ x = 1; }\n",
        );
        assert!(rt.has_dialogue("hub"));
        assert!(rt.has_dialogue("real"));
        assert!(!rt.has_dialogue("missing"));
        assert!(!rt.has_dialogue("dead"));
        assert!(!rt.has_dialogue("loop"));
        assert!(!rt.has_dialogue("coded"));

        rt.start_conversation("real").unwrap();
        rt.end_conversation();
        assert!(!rt.has_dialogue("hub"));
    }

    #[test]
    fn has_more_text_tracks_position() {
        let mut rt = runtime("# a\n[Bob]: one\n\n[Bob]: two\n\n=>b\n\n# b\n[Bob]: last\n");
        assert!(!rt.has_more_text());

        rt.start_conversation("a").unwrap();
        assert!(rt.has_more_text());
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.display().last_text(), Some("two"));
        assert!(rt.has_more_text());
        rt.continue_dialogue().unwrap();
        assert_eq!(rt.current_key(), Some("b"));
        assert!(!rt.has_more_text());
    }

    #[test]
    fn continue_skips_text_reveal_first() {
        let mut rt = runtime("# a\n[Bob]: one\n\n[Bob]: two\n");
        rt.start_conversation("a").unwrap();
        rt.display_mut().displaying = true;

        rt.continue_dialogue().unwrap();
        assert_eq!(rt.display().skips, 1);
        assert_eq!(rt.display().last_text(), Some("one"));

        rt.continue_dialogue().unwrap();
        assert_eq!(rt.display().last_text(), Some("two"));
    }

    #[test]
    fn end_conversation_clears_display() {
        let mut rt = runtime("# a\n[Bob]: one\n");
        rt.start_conversation("a").unwrap();
        rt.end_conversation();
        assert_eq!(rt.display().clears, 1);
        rt.end_conversation();
        assert_eq!(rt.take_events(), vec![started("a"), DialogueEvent::Ended]);
    }

    #[test]
    fn set_input_reaches_display() {
        let mut rt = runtime("# a\n[Bob]: one\n");
        rt.set_input(InputAxis::new(0.0, -1.0));
        assert_eq!(rt.display().input, Some(InputAxis::new(0.0, -1.0)));
    }

    #[test]
    fn first_store_wins_on_key_collision() {
        let mut rt = runtime("# a\n[Bob]: first\n");
        rt.add_data(data("# a\n[Bob]: second\n"));
        rt.start_conversation("a").unwrap();
        assert_eq!(rt.display().last_text(), Some("first"));
        assert_eq!(rt.data().len(), 2);
    }

    #[test]
    fn starting_new_dialogue_ends_old_one() {
        let mut rt = runtime(BRANCH);
        rt.start_conversation("q").unwrap();
        rt.start_conversation("n").unwrap();
        assert_eq!(
            rt.take_events(),
            vec![started("q"), DialogueEvent::Ended, started("n")]
        );
    }
}
