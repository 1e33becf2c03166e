//! Per-variant tag tables driving the shared extraction machine.
//!
//! Schema drift between the three formats lives here as data: which tag
//! feeds which scalar slot, which tags open prose sections, and what happens
//! when a tag closes.

use crate::variant::SchemaVariant;

/// Scalar content slots filled from single-valued tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Slot {
    Kind,
    Country,
    DocNumber,
    Date,
    IssueDate,
    ApplicationNumber,
    ApplicationType,
    Title,
    FirstName,
    LastName,
    OrgName,
    DisplayName,
    Section,
    Class,
    Subclass,
    MainGroup,
    Subgroup,
    MainClassification,
    IpcMain,
    IpcFurther,
}

/// Prose accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextField {
    Abstract,
    Description,
    Claims,
}

/// How text fragments are joined inside a prose section.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TextJoin {
    /// Fragments are concatenated as delivered.
    Direct,
    /// Fragments opened by one of these codes start a new paragraph; other
    /// untagged fragments continue the current one.
    Paragraphs(&'static [&'static str]),
}

/// Source of the document type.
#[derive(Debug, Clone, Copy)]
pub(crate) enum KindRule {
    /// Attribute value captured from a start tag.
    Declared,
    /// First letter of a kind code (`S`, `P`, `M`, anything else utility).
    KindCodePrefix(Slot),
    /// Leading digit of an application type (`4`, `6`, anything else utility).
    ApplicationTypeDigit(Slot),
}

/// Condition on the enclosing context for a closer to fire.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Guard {
    Always,
    Within(&'static str),
    Outside(&'static str),
}

/// Work done when a tag closes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    ComposeDocumentId,
    PublicationFromDocumentId,
    ApplicationFromDocumentId,
    PublicationNumber(Slot),
    PublicationDate(Slot),
    ApplicationNumber(Slot),
    ApplicationDate(Slot),
    Title(Slot),
    DocumentType(KindRule),
    ComposePartyName,
    Inventor,
    InventorFromDisplayName(Slot),
    Assignee,
    AssigneeFromSlot(Slot),
    InternationalCode,
    CooperativeCode,
    InternationalFromSlot(Slot),
    InternationalMainAndFurther,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Closer {
    pub tag: &'static str,
    pub guard: Guard,
    pub action: Action,
}

const fn on(tag: &'static str, action: Action) -> Closer {
    Closer {
        tag,
        guard: Guard::Always,
        action,
    }
}

const fn on_within(tag: &'static str, context: &'static str, action: Action) -> Closer {
    Closer {
        tag,
        guard: Guard::Within(context),
        action,
    }
}

const fn on_outside(tag: &'static str, context: &'static str, action: Action) -> Closer {
    Closer {
        tag,
        guard: Guard::Outside(context),
        action,
    }
}

/// Complete description of one schema variant.
#[derive(Debug)]
pub(crate) struct Profile {
    /// Start tag that clears all per-document state.
    pub record_start: &'static str,
    pub slots: &'static [(&'static str, Slot)],
    pub text_sections: &'static [(&'static str, TextField)],
    /// Tags that establish a context for guarded closers, with their label.
    pub contexts: &'static [(&'static str, &'static str)],
    /// `(tag, attribute)` pairs whose value declares the document type.
    pub captures: &'static [(&'static str, &'static str)],
    /// Slots cleared when a tag opens.
    pub resets: &'static [(&'static str, &'static [Slot])],
    pub closers: &'static [Closer],
    pub text_join: TextJoin,
}

impl Profile {
    pub fn for_variant(variant: SchemaVariant) -> &'static Profile {
        match variant {
            SchemaVariant::LegacyText => &LEGACY_TEXT,
            SchemaVariant::XmlGenA => &XML_GEN_A,
            SchemaVariant::XmlGenB => &XML_GEN_B,
        }
    }

    pub fn slot_for(&self, tag: &str) -> Option<Slot> {
        lookup(self.slots, tag)
    }

    pub fn text_section_for(&self, tag: &str) -> Option<TextField> {
        lookup(self.text_sections, tag)
    }

    pub fn context_for(&self, tag: &str) -> Option<&'static str> {
        lookup(self.contexts, tag)
    }

    pub fn capture_for(&self, tag: &str) -> Option<&'static str> {
        lookup(self.captures, tag)
    }

    pub fn resets_for(&self, tag: &str) -> &'static [Slot] {
        lookup(self.resets, tag).unwrap_or(&[])
    }

    pub fn closers_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Closer> + 'a {
        self.closers.iter().filter(move |closer| closer.tag == tag)
    }
}

fn lookup<T: Copy>(table: &[(&'static str, T)], tag: &str) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, value)| *value)
}

const DOCUMENT_ID_PARTS: &[Slot] = &[Slot::Country, Slot::DocNumber, Slot::Kind, Slot::Date];
const NAME_PARTS: &[Slot] = &[Slot::FirstName, Slot::LastName, Slot::OrgName];
const CODE_PARTS: &[Slot] = &[
    Slot::Section,
    Slot::Class,
    Slot::Subclass,
    Slot::MainGroup,
    Slot::Subgroup,
];

/// Section header lines of the legacy text format.
pub(crate) const LEGACY_SECTIONS: &[&str] = &[
    "PATN", "INVT", "ASSG", "PRIR", "REIS", "RLAP", "CLAS", "UREF", "FREF", "OREF", "LREP",
    "PCTA", "ABST", "GOVT", "PARN", "BSUM", "DRWD", "DETD", "CLMS", "DCLM",
];

const LEGACY_PARAGRAPH_CODES: &[&str] = &[
    "PAR", "PAC", "PAL", "PA1", "PA2", "PA3", "PA4", "PA5", "FNT", "TBL", "EQU",
];

static LEGACY_TEXT: Profile = Profile {
    record_start: "PATN",
    slots: &[
        ("WKU", Slot::DocNumber),
        ("APN", Slot::ApplicationNumber),
        ("APT", Slot::ApplicationType),
        ("APD", Slot::Date),
        ("ISD", Slot::IssueDate),
        ("TTL", Slot::Title),
        ("NAM", Slot::DisplayName),
        ("ICL", Slot::IpcMain),
    ],
    text_sections: &[
        ("ABST", TextField::Abstract),
        ("BSUM", TextField::Description),
        ("DETD", TextField::Description),
        ("DRWD", TextField::Description),
        ("CLMS", TextField::Claims),
        ("DCLM", TextField::Claims),
    ],
    contexts: &[
        ("PATN", "PATN"),
        ("INVT", "INVT"),
        ("ASSG", "ASSG"),
        ("PRIR", "PRIR"),
        ("REIS", "REIS"),
        ("RLAP", "RLAP"),
        ("CLAS", "CLAS"),
        ("UREF", "UREF"),
        ("FREF", "FREF"),
        ("OREF", "OREF"),
        ("LREP", "LREP"),
        ("PCTA", "PCTA"),
        ("ABST", "ABST"),
        ("GOVT", "GOVT"),
        ("PARN", "PARN"),
        ("BSUM", "BSUM"),
        ("DRWD", "DRWD"),
        ("DETD", "DETD"),
        ("CLMS", "CLMS"),
        ("DCLM", "DCLM"),
    ],
    captures: &[],
    resets: &[],
    closers: &[
        on_within("WKU", "PATN", Action::PublicationNumber(Slot::DocNumber)),
        on_within("APN", "PATN", Action::ApplicationNumber(Slot::ApplicationNumber)),
        on_within(
            "APT",
            "PATN",
            Action::DocumentType(KindRule::ApplicationTypeDigit(Slot::ApplicationType)),
        ),
        on_within("APD", "PATN", Action::ApplicationDate(Slot::Date)),
        on_within("ISD", "PATN", Action::PublicationDate(Slot::IssueDate)),
        on_within("TTL", "PATN", Action::Title(Slot::Title)),
        on_within("NAM", "INVT", Action::InventorFromDisplayName(Slot::DisplayName)),
        on_within("NAM", "ASSG", Action::AssigneeFromSlot(Slot::DisplayName)),
        on_within("ICL", "CLAS", Action::InternationalFromSlot(Slot::IpcMain)),
    ],
    text_join: TextJoin::Paragraphs(LEGACY_PARAGRAPH_CODES),
};

static XML_GEN_A: Profile = Profile {
    record_start: "PATDOC",
    slots: &[
        ("B130", Slot::Kind),
        ("B190", Slot::Country),
        ("B110", Slot::DocNumber),
        ("B210", Slot::ApplicationNumber),
        ("DATE", Slot::Date),
        ("B540", Slot::Title),
        ("SNM", Slot::LastName),
        ("FNM", Slot::FirstName),
        ("ONM", Slot::OrgName),
        ("B511", Slot::IpcMain),
        ("B512", Slot::IpcFurther),
    ],
    text_sections: &[
        ("SDOAB", TextField::Abstract),
        ("SDODE", TextField::Description),
        ("SDOCL", TextField::Claims),
    ],
    contexts: &[],
    captures: &[],
    resets: &[
        ("B100", DOCUMENT_ID_PARTS),
        ("B200", &[Slot::ApplicationNumber, Slot::Date]),
        ("PARTY-US", NAME_PARTS),
        ("B510", &[Slot::IpcMain, Slot::IpcFurther]),
    ],
    closers: &[
        on("B100", Action::ComposeDocumentId),
        on("B100", Action::PublicationFromDocumentId),
        on("B100", Action::DocumentType(KindRule::KindCodePrefix(Slot::Kind))),
        on("B540", Action::Title(Slot::Title)),
        on("B200", Action::ApplicationNumber(Slot::ApplicationNumber)),
        on("B200", Action::ApplicationDate(Slot::Date)),
        on("PARTY-US", Action::ComposePartyName),
        on("B721", Action::Inventor),
        on("B731", Action::Assignee),
        on("B510", Action::InternationalMainAndFurther),
    ],
    text_join: TextJoin::Direct,
};

static XML_GEN_B: Profile = Profile {
    record_start: "us-patent-grant",
    slots: &[
        ("kind", Slot::Kind),
        ("country", Slot::Country),
        ("country-code", Slot::Country),
        ("doc-number", Slot::DocNumber),
        ("date", Slot::Date),
        ("document-date", Slot::Date),
        ("invention-title", Slot::Title),
        ("title-of-invention", Slot::Title),
        ("last-name", Slot::LastName),
        ("family-name", Slot::LastName),
        ("first-name", Slot::FirstName),
        ("given-name", Slot::FirstName),
        ("orgname", Slot::OrgName),
        ("organization-name", Slot::OrgName),
        ("section", Slot::Section),
        ("class", Slot::Class),
        ("subclass", Slot::Subclass),
        ("main-group", Slot::MainGroup),
        ("subgroup", Slot::Subgroup),
        ("main-classification", Slot::MainClassification),
    ],
    text_sections: &[
        ("abstract", TextField::Abstract),
        ("description", TextField::Description),
        ("claims", TextField::Claims),
    ],
    contexts: &[("citation", "citation"), ("us-citation", "citation")],
    captures: &[("application-reference", "appl-type")],
    resets: &[
        ("document-id", DOCUMENT_ID_PARTS),
        ("addressbook", NAME_PARTS),
        ("classification-ipcr", CODE_PARTS),
        ("classification-cpc", CODE_PARTS),
        ("classification-ipc", &[Slot::MainClassification]),
    ],
    closers: &[
        on("document-id", Action::ComposeDocumentId),
        on("publication-reference", Action::PublicationFromDocumentId),
        on("application-reference", Action::ApplicationFromDocumentId),
        on("application-reference", Action::DocumentType(KindRule::Declared)),
        on("invention-title", Action::Title(Slot::Title)),
        on("addressbook", Action::ComposePartyName),
        on("inventor", Action::Inventor),
        on("applicant", Action::Inventor),
        on("assignee", Action::Assignee),
        on("classification-ipcr", Action::InternationalCode),
        on("classification-cpc", Action::CooperativeCode),
        on_outside(
            "classification-ipc",
            "citation",
            Action::InternationalFromSlot(Slot::MainClassification),
        ),
    ],
    text_join: TextJoin::Direct,
};

#[cfg(test)]
mod tests {
    use super::{Profile, Slot, TextField, LEGACY_SECTIONS};
    use crate::variant::SchemaVariant;

    #[test]
    fn record_start_tags() {
        let starts: Vec<&str> = SchemaVariant::ALL
            .iter()
            .map(|variant| Profile::for_variant(*variant).record_start)
            .collect();
        assert_eq!(starts, vec!["PATN", "PATDOC", "us-patent-grant"]);
    }

    #[test]
    fn aliases_share_slots() {
        let profile = Profile::for_variant(SchemaVariant::XmlGenB);
        assert_eq!(profile.slot_for("organization-name"), Some(Slot::OrgName));
        assert_eq!(profile.slot_for("title-of-invention"), Some(Slot::Title));
        assert_eq!(profile.slot_for("us-patent-grant"), None);
    }

    #[test]
    fn legacy_text_sections_are_known_sections() {
        let profile = Profile::for_variant(SchemaVariant::LegacyText);
        for (tag, _) in profile.text_sections {
            assert!(LEGACY_SECTIONS.contains(tag), "{tag} is not a section");
        }
        assert_eq!(profile.text_section_for("DRWD"), Some(TextField::Description));
        for (tag, label) in profile.contexts {
            assert_eq!(tag, label);
            assert!(LEGACY_SECTIONS.contains(tag));
        }
    }

    #[test]
    fn xml_gen_a_closes_publication_data_on_b100() {
        let profile = Profile::for_variant(SchemaVariant::XmlGenA);
        assert_eq!(profile.closers_for("B100").count(), 3);
        assert_eq!(profile.closers_for("B999").count(), 0);
    }
}
