//! Message delivery provider implementations.

pub(crate) mod traits;
pub(crate) mod util;

pub mod meta;
pub mod mock;
pub mod sendgrid;
pub mod smtp2go;
pub mod telegram;
pub mod twilio;
pub mod whatsapp_personal;

pub use meta::{MetaWhatsAppConfig, MetaWhatsAppProvider};
pub use mock::{MockProvider, SentMessage};
pub use sendgrid::{SendGridConfig, SendGridProvider};
pub use smtp2go::{Smtp2GoConfig, Smtp2GoProvider};
pub use telegram::{TelegramBotProvider, TelegramConfig};
pub use traits::MessagingProvider;
pub use twilio::{
    TwilioConfig, TwilioContentApi, TwilioSmsConfig, TwilioSmsProvider, TwilioWhatsAppProvider,
};
pub use whatsapp_personal::{WhatsAppPersonalConfig, WhatsAppPersonalProvider};
