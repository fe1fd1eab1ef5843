//! Bundles the three external services behind one type parameter.

use dialer_core::provider::{IntentClassifier, MessagingService, VoiceService};

/// The external services an [`crate::Orchestrator`] talks to.
pub trait Providers: Send + Sync {
  type Voice: VoiceService;
  type Messaging: MessagingService;
  type Classifier: IntentClassifier;

  fn voice(&self) -> &Self::Voice;
  fn messaging(&self) -> &Self::Messaging;
  fn classifier(&self) -> &Self::Classifier;
}

/// Plain struct implementation of [`Providers`].
#[derive(Debug, Clone)]
pub struct ProviderSet<V, M, C> {
  pub voice:      V,
  pub messaging:  M,
  pub classifier: C,
}

impl<V, M, C> Providers for ProviderSet<V, M, C>
where
  V: VoiceService,
  M: MessagingService,
  C: IntentClassifier,
{
  type Voice = V;
  type Messaging = M;
  type Classifier = C;

  fn voice(&self) -> &V { &self.voice }

  fn messaging(&self) -> &M { &self.messaging }

  fn classifier(&self) -> &C { &self.classifier }
}
