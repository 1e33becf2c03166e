//! Event-driven field extraction.
//!
//! Every variant is reduced to the same three events (tag opened, text seen,
//! tag closed). A single [`Extractor`] interprets them against the variant's
//! profile table and fills one [`PatentRecord`].

mod legacy;
mod profile;
mod xml;

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::record::{parse_date, sentinel_date, DocumentType, PatentRecord};
use crate::split::LogicalDocument;
use crate::variant::SchemaVariant;

use self::profile::{Action, Guard, KindRule, Profile, Slot, TextField, TextJoin};

pub(crate) use self::profile::LEGACY_SECTIONS;

/// Receiver of the uniform tag event stream produced by the input drivers.
pub trait TagHandler {
    /// A tag opened. Attributes are `(name, value)` pairs in source order.
    fn start(&mut self, tag: &str, attributes: &[(String, String)]);
    /// Character data inside the innermost open tag.
    fn data(&mut self, text: &str);
    /// A tag closed.
    fn end(&mut self, tag: &str);
}

/// Per-document scratch state.
#[derive(Debug)]
pub struct ExtractionState {
    /// Slot each open tag writes into; unmapped tags inherit their parent's.
    slot_stack: Vec<Option<Slot>>,
    /// Tag opened since the last close, if any.
    open_tag: Option<String>,
    contexts: Vec<&'static str>,
    content: HashMap<Slot, String>,
    active_text: Option<TextField>,
    abstract_text: String,
    description: String,
    claims: String,
    document_id: String,
    document_date: NaiveDate,
    declared_type: Option<String>,
    person_name: String,
    org_name: String,
    inventors: Vec<String>,
    assignees: Vec<String>,
    international: Vec<String>,
    cooperative: Vec<String>,
}

impl Default for ExtractionState {
    fn default() -> Self {
        Self {
            slot_stack: Vec::new(),
            open_tag: None,
            contexts: Vec::new(),
            content: HashMap::new(),
            active_text: None,
            abstract_text: String::new(),
            description: String::new(),
            claims: String::new(),
            document_id: String::new(),
            document_date: sentinel_date(),
            declared_type: None,
            person_name: String::new(),
            org_name: String::new(),
            inventors: Vec::new(),
            assignees: Vec::new(),
            international: Vec::new(),
            cooperative: Vec::new(),
        }
    }
}

impl ExtractionState {
    fn slot(&self, slot: Slot) -> &str {
        self.content.get(&slot).map(|value| value.trim()).unwrap_or("")
    }

    fn accumulator(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Abstract => &mut self.abstract_text,
            TextField::Description => &mut self.description,
            TextField::Claims => &mut self.claims,
        }
    }

    fn guard_holds(&self, guard: Guard) -> bool {
        match guard {
            Guard::Always => true,
            Guard::Within(context) => self.contexts.last() == Some(&context),
            Guard::Outside(context) => !self.contexts.contains(&context),
        }
    }

    fn classification_code(&self) -> String {
        format!(
            "{}{}{}{}/{}",
            self.slot(Slot::Section),
            self.slot(Slot::Class),
            self.slot(Slot::Subclass),
            self.slot(Slot::MainGroup),
            self.slot(Slot::Subgroup),
        )
    }
}

/// Stateful interpreter of one document's tag events.
#[derive(Debug)]
pub struct Extractor {
    profile: &'static Profile,
    state: ExtractionState,
    record: PatentRecord,
}

impl Extractor {
    pub fn new(variant: SchemaVariant) -> Self {
        Self {
            profile: Profile::for_variant(variant),
            state: ExtractionState::default(),
            record: PatentRecord::default(),
        }
    }

    /// Completes the record. Prose sections left open by a truncated
    /// document keep the text seen so far.
    pub fn finish(mut self) -> PatentRecord {
        if let Some(field) = self.state.active_text.take() {
            self.store_text(field);
        }
        let state = self.state;
        self.record.inventors = state.inventors;
        self.record.assignees = state.assignees;
        self.record.international_classifications = state.international;
        self.record.cooperative_classifications = state.cooperative;
        self.record
    }

    fn reset(&mut self) {
        self.state = ExtractionState::default();
        self.record = PatentRecord::default();
    }

    fn store_text(&mut self, field: TextField) {
        let text = self.state.accumulator(field).trim().to_string();
        match field {
            TextField::Abstract => self.record.abstract_text = text,
            TextField::Description => self.record.description = text,
            TextField::Claims => self.record.claims = text,
        }
    }

    fn append_text(&mut self, field: TextField, text: &str) {
        match self.profile.text_join {
            TextJoin::Direct => {
                let target = self.state.accumulator(field);
                if field == TextField::Claims && text == "\n" && target.ends_with('\n') {
                    return;
                }
                target.push_str(text);
            }
            TextJoin::Paragraphs(codes) => {
                let paragraph = match self.state.open_tag.as_deref() {
                    None => false,
                    Some(tag) if codes.contains(&tag) => true,
                    // A continuation line right under the section header.
                    Some(tag) if self.profile.text_section_for(tag).is_some() => false,
                    // Other fields inside a prose section are not prose.
                    Some(_) => return,
                };
                let target = self.state.accumulator(field);
                if !target.is_empty() {
                    target.push(if paragraph { '\n' } else { ' ' });
                }
                target.push_str(text);
            }
        }
    }

    fn apply(&mut self, action: Action) {
        let state = &mut self.state;
        let record = &mut self.record;
        match action {
            Action::ComposeDocumentId => {
                state.document_id = format!(
                    "{}{}{}",
                    state.slot(Slot::Country),
                    state.slot(Slot::DocNumber),
                    state.slot(Slot::Kind),
                );
                state.document_date = parse_date(state.slot(Slot::Date));
            }
            Action::PublicationFromDocumentId => {
                record.publication_number = state.document_id.clone();
                record.publication_date = state.document_date;
            }
            Action::ApplicationFromDocumentId => {
                record.application_number = state.document_id.clone();
                record.application_date = state.document_date;
            }
            Action::PublicationNumber(slot) => {
                record.publication_number = state.slot(slot).to_string();
            }
            Action::PublicationDate(slot) => record.publication_date = parse_date(state.slot(slot)),
            Action::ApplicationNumber(slot) => {
                record.application_number = state.slot(slot).to_string();
            }
            Action::ApplicationDate(slot) => record.application_date = parse_date(state.slot(slot)),
            Action::Title(slot) => record.title = state.slot(slot).to_string(),
            Action::DocumentType(rule) => record.document_type = document_type(state, rule),
            Action::ComposePartyName => {
                let first = state.slot(Slot::FirstName);
                let last = state.slot(Slot::LastName);
                state.person_name = match (first.is_empty(), last.is_empty()) {
                    (false, false) => format!("{first} {last}"),
                    (false, true) => first.to_string(),
                    _ => last.to_string(),
                };
                state.org_name = state.slot(Slot::OrgName).to_string();
            }
            Action::Inventor => {
                let name = std::mem::take(&mut state.person_name);
                state.org_name.clear();
                push_nonempty(&mut state.inventors, name);
            }
            Action::InventorFromDisplayName(slot) => {
                let name = display_name(state.slot(slot));
                push_nonempty(&mut state.inventors, name);
            }
            Action::Assignee => {
                let person = std::mem::take(&mut state.person_name);
                let org = std::mem::take(&mut state.org_name);
                let name = if org.is_empty() { person } else { org };
                push_nonempty(&mut state.assignees, name);
            }
            Action::AssigneeFromSlot(slot) => {
                let name = state.slot(slot).to_string();
                push_nonempty(&mut state.assignees, name);
            }
            Action::InternationalCode => {
                let code = state.classification_code();
                if code != "/" {
                    state.international.push(code);
                }
            }
            Action::CooperativeCode => {
                let code = state.classification_code();
                if code != "/" {
                    state.cooperative.push(code);
                }
            }
            Action::InternationalFromSlot(slot) => {
                let code = state.slot(slot).to_string();
                push_nonempty(&mut state.international, code);
            }
            Action::InternationalMainAndFurther => {
                let main = state.slot(Slot::IpcMain).to_string();
                let further = state.slot(Slot::IpcFurther).to_string();
                state.international.clear();
                if !main.is_empty() {
                    state.international.push(main);
                    push_nonempty(&mut state.international, further);
                }
            }
        }
    }
}

impl TagHandler for Extractor {
    fn start(&mut self, tag: &str, attributes: &[(String, String)]) {
        let profile = self.profile;
        if tag == profile.record_start {
            self.reset();
        }

        for slot in profile.resets_for(tag) {
            self.state.content.remove(slot);
        }
        let parent = self.state.slot_stack.last().copied().flatten();
        let slot = profile.slot_for(tag);
        if let Some(slot) = slot {
            self.state.content.remove(&slot);
        }
        self.state.slot_stack.push(slot.or(parent));
        self.state.open_tag = Some(tag.to_string());

        if let Some(context) = profile.context_for(tag) {
            self.state.contexts.push(context);
        }
        if let Some(field) = profile.text_section_for(tag) {
            self.state.active_text = Some(field);
        }
        if let Some(attribute) = profile.capture_for(tag) {
            let declared = attributes
                .iter()
                .find(|(name, _)| name == attribute)
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            self.state.declared_type = Some(declared);
        }
    }

    fn data(&mut self, text: &str) {
        if let Some(field) = self.state.active_text {
            self.append_text(field, text);
            return;
        }
        if text.trim().is_empty() {
            return;
        }
        if let Some(Some(slot)) = self.state.slot_stack.last() {
            self.state.content.entry(*slot).or_default().push_str(text);
        }
    }

    fn end(&mut self, tag: &str) {
        let profile = self.profile;
        for closer in profile.closers_for(tag) {
            if self.state.guard_holds(closer.guard) {
                self.apply(closer.action);
            }
        }
        if let Some(field) = profile.text_section_for(tag) {
            if self.state.active_text == Some(field) {
                self.state.active_text = None;
            }
            self.store_text(field);
        }
        if let Some(context) = profile.context_for(tag) {
            if self.state.contexts.last() == Some(&context) {
                self.state.contexts.pop();
            }
        }
        self.state.slot_stack.pop();
        self.state.open_tag = None;
    }
}

fn document_type(state: &ExtractionState, rule: KindRule) -> DocumentType {
    match rule {
        KindRule::Declared => state
            .declared_type
            .as_deref()
            .map(DocumentType::from_declared)
            .unwrap_or_default(),
        KindRule::KindCodePrefix(slot) => match state.slot(slot).chars().next() {
            None => DocumentType::Undefined,
            Some('S') => DocumentType::Design,
            Some('P') => DocumentType::Plant,
            Some('M') => DocumentType::Medical,
            Some(_) => DocumentType::Utility,
        },
        KindRule::ApplicationTypeDigit(slot) => match state.slot(slot).chars().next() {
            None => DocumentType::Undefined,
            Some('4') => DocumentType::Design,
            Some('6') => DocumentType::Plant,
            Some(_) => DocumentType::Utility,
        },
    }
}

/// Turns a `Last; First` name into `First Last`.
fn display_name(raw: &str) -> String {
    let mut parts = raw.split(';');
    let last = parts.next().unwrap_or("").trim();
    match parts.next().map(str::trim) {
        Some(first) if !first.is_empty() => format!("{first} {last}"),
        _ => last.to_string(),
    }
}

fn push_nonempty(list: &mut Vec<String>, value: String) {
    if !value.is_empty() {
        list.push(value);
    }
}

/// Extracts one record from a logical document of the given variant.
///
/// Never fails: malformed markup or truncated input yields whatever fields
/// were reached, with defaults for the rest.
pub fn extract_document(variant: SchemaVariant, document: &LogicalDocument) -> PatentRecord {
    let mut extractor = Extractor::new(variant);
    match variant {
        SchemaVariant::LegacyText => legacy::feed(&document.text(), &mut extractor),
        SchemaVariant::XmlGenA | SchemaVariant::XmlGenB => {
            xml::feed(document.as_bytes(), &mut extractor)
        }
    }
    extractor.finish()
}
