/// Whether the server binary may be refreshed from the update endpoint.
///
/// Persisted as an optional boolean: `true` is [`AlwaysUpdate`], `false` is
/// [`NeverUpdate`] and an absent key is [`Unset`]. [`UpdateOnce`] only exists
/// as a prompt answer and is never written back.
///
/// [`AlwaysUpdate`]: UpdatePreference::AlwaysUpdate
/// [`NeverUpdate`]: UpdatePreference::NeverUpdate
/// [`Unset`]: UpdatePreference::Unset
/// [`UpdateOnce`]: UpdatePreference::UpdateOnce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePreference {
    AlwaysUpdate,
    UpdateOnce,
    NeverUpdate,
    #[default]
    Unset,
}

impl UpdatePreference {
    #[must_use]
    pub fn from_persisted(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::AlwaysUpdate,
            Some(false) => Self::NeverUpdate,
            None => Self::Unset,
        }
    }

    /// The value to store, or `None` when this preference is not persisted.
    #[must_use]
    pub fn to_persisted(self) -> Option<bool> {
        match self {
            Self::AlwaysUpdate => Some(true),
            Self::NeverUpdate => Some(false),
            Self::UpdateOnce | Self::Unset => None,
        }
    }

    /// `None` means the user has to be asked.
    #[must_use]
    pub fn allows_update(self) -> Option<bool> {
        match self {
            Self::AlwaysUpdate | Self::UpdateOnce => Some(true),
            Self::NeverUpdate => Some(false),
            Self::Unset => None,
        }
    }
}

/// One answer to the update consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateConsent {
    InstallAndEnable,
    InstallOnce,
    ChooseManually,
    Enable,
    Disable,
}

impl UpdateConsent {
    const FIRST_INSTALL: [Self; 3] = [
        Self::InstallAndEnable,
        Self::InstallOnce,
        Self::ChooseManually,
    ];
    const REFRESH: [Self; 2] = [Self::Enable, Self::Disable];

    /// The answers offered, in display order. A refresh of an installed
    /// binary does not offer the one-shot or manual answers.
    #[must_use]
    pub fn choices(first_install: bool) -> &'static [Self] {
        if first_install {
            &Self::FIRST_INSTALL
        } else {
            &Self::REFRESH
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InstallAndEnable => "Install dm-langserver now and enable updates (recommended).",
            Self::InstallOnce => "Install dm-langserver now, ask again next time.",
            Self::ChooseManually => "Manually select dm-langserver executable.",
            Self::Enable => "Enable dm-langserver updates (recommended).",
            Self::Disable => "Disable dm-langserver updates.",
        }
    }

    #[must_use]
    pub fn preference(self) -> UpdatePreference {
        match self {
            Self::InstallAndEnable | Self::Enable => UpdatePreference::AlwaysUpdate,
            Self::InstallOnce => UpdatePreference::UpdateOnce,
            Self::ChooseManually | Self::Disable => UpdatePreference::NeverUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_round_trip() {
        for pref in [UpdatePreference::AlwaysUpdate, UpdatePreference::NeverUpdate] {
            assert_eq!(UpdatePreference::from_persisted(pref.to_persisted()), pref);
        }
        assert_eq!(UpdatePreference::from_persisted(None), UpdatePreference::Unset);
    }

    #[test]
    fn once_is_not_persisted_but_allows_update() {
        assert_eq!(UpdatePreference::UpdateOnce.to_persisted(), None);
        assert_eq!(UpdatePreference::UpdateOnce.allows_update(), Some(true));
        assert_eq!(UpdatePreference::Unset.allows_update(), None);
        assert_eq!(UpdatePreference::NeverUpdate.allows_update(), Some(false));
    }

    #[test]
    fn one_shot_label_says_the_question_returns() {
        assert_eq!(
            UpdateConsent::InstallOnce.label(),
            "Install dm-langserver now, ask again next time."
        );
        assert!(UpdateConsent::InstallOnce.preference().to_persisted().is_none());
    }

    #[test]
    fn consent_choices_depend_on_install_state() {
        let first: Vec<_> = UpdateConsent::choices(true)
            .iter()
            .map(|c| c.preference())
            .collect();
        assert_eq!(
            first,
            [
                UpdatePreference::AlwaysUpdate,
                UpdatePreference::UpdateOnce,
                UpdatePreference::NeverUpdate
            ]
        );
        assert_eq!(UpdateConsent::choices(false).len(), 2);
        assert!(
            UpdateConsent::choices(false)
                .iter()
                .all(|c| c.preference() != UpdatePreference::UpdateOnce)
        );
    }
}
