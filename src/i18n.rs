//! Localized reply templates. Templates use named `{placeholder}` slots.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
    Ru,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Es, Locale::Ru];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Ru => "ru",
        }
    }

    /// Exact locale code ("en", "es", "ru").
    pub fn from_code(code: &str) -> Option<Locale> {
        Locale::ALL
            .into_iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Maps a client language tag such as `es-AR` to a supported locale, English otherwise.
    pub fn detect(language_code: Option<&str>) -> Locale {
        match language_code.map(|code| code.trim().to_ascii_lowercase()) {
            Some(code) if code.starts_with("es") => Locale::Es,
            Some(code) if code.starts_with("ru") => Locale::Ru,
            _ => Locale::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Welcome,
    NoPermission,
    ProvideLocation,
    SimpleInfoHeader,
    ColorCount,
    SimpleInfoFooter,
    NoInfoFound,
    SavedSuccessfully,
    MessageForwarded,
    MessageInGroup,
    ProcessingInfo,
    InvalidMessage,
    ExportError,
    HelpMessage,
    /// Shown when a requested key name is unknown.
    Fallback,
}

impl MessageKey {
    pub fn from_name(name: &str) -> Option<MessageKey> {
        let key = match name {
            "welcome" => MessageKey::Welcome,
            "no_permission" => MessageKey::NoPermission,
            "provide_location" => MessageKey::ProvideLocation,
            "simple_info_header" => MessageKey::SimpleInfoHeader,
            "color_count" => MessageKey::ColorCount,
            "simple_info_footer" => MessageKey::SimpleInfoFooter,
            "no_info_found" => MessageKey::NoInfoFound,
            "saved_successfully" => MessageKey::SavedSuccessfully,
            "message_forwarded" => MessageKey::MessageForwarded,
            "message_in_group" => MessageKey::MessageInGroup,
            "processing_info" => MessageKey::ProcessingInfo,
            "invalid_message" => MessageKey::InvalidMessage,
            "export_error" => MessageKey::ExportError,
            "help_message" => MessageKey::HelpMessage,
            "fallback" => MessageKey::Fallback,
            _ => return None,
        };
        Some(key)
    }
}

fn template(locale: Locale, key: MessageKey) -> &'static str {
    use MessageKey::*;

    match (locale, key) {
        (_, ColorCount) => "\n{symbol} -> {count}",

        (Locale::En, Welcome) => "Welcome {name} to our exploration center!",
        (Locale::En, NoPermission) => "Sorry, you don't have permission to use this bot.",
        (Locale::En, ProvideLocation) => "Please provide a location in the correct format (e.g., gy2).",
        (Locale::En, SimpleInfoHeader) => "Location: {location}",
        (Locale::En, SimpleInfoFooter) => "\nElapsed time: {minutes} minutes\nPosted by: {user}",
        (Locale::En, NoInfoFound) => "No information found for location {location}.",
        (Locale::En, SavedSuccessfully) => {
            "Saved!\nLocation: {location}\nColor Details: {details}\nPosted By: {user}"
        }
        (Locale::En, MessageForwarded) => "The message must be forwarded from the game bot!",
        (Locale::En, MessageInGroup) => "Report received, thank you for your help! 🫡",
        (Locale::En, ProcessingInfo) => "Processing information...",
        (Locale::En, InvalidMessage) => "Invalid message format!",
        (Locale::En, ExportError) => "An error occurred: {error}",
        (Locale::En, HelpMessage) => {
            "Help:\n\
             Use /i + location (e.g., gy2) to get complete information about a specific tile.\n\
             Use /info + location (e.g., y31) to get the saved report text of that location.\n\
             Use /export to get the tile database as CSV.\n\
             Use /set_language to change the bot's language."
        }
        (Locale::En, Fallback) => "ERROR:XXX>Sorry, the requested text is not available.",

        (Locale::Es, Welcome) => "Bienvenido/a {name} a nuestro centro de exploracion!",
        (Locale::Es, NoPermission) => "Lo siento, no tienes permiso para usar este bot.",
        (Locale::Es, ProvideLocation) => {
            "Por favor, proporciona una ubicación en el formato adecuado (por ejemplo, gy2)."
        }
        (Locale::Es, SimpleInfoHeader) => "Ubicación: {location}",
        (Locale::Es, SimpleInfoFooter) => {
            "\nTiempo transcurrido: {minutes} minutos\nPublicado por: {user}"
        }
        (Locale::Es, NoInfoFound) => "No se encontró información para la ubicación {location}.",
        (Locale::Es, SavedSuccessfully) => {
            "¡Guardado!\nUbicación: {location}\nDetalles de colores: {details}\nPublicado por: {user}"
        }
        (Locale::Es, MessageForwarded) => "¡El mensaje debe ser reenviado desde el bot del juego!",
        (Locale::Es, MessageInGroup) => "Reporte recibido, ¡gracias por tu ayuda! 🫡",
        (Locale::Es, ProcessingInfo) => "Procesando información...",
        (Locale::Es, InvalidMessage) => "¡Mensaje enviado no válido!",
        (Locale::Es, ExportError) => "Ocurrió un error: {error}",
        (Locale::Es, HelpMessage) => {
            "Ayuda:\n\
             Usa /i + ubicación (ej: gy2) para obtener la información completa de una casilla específica.\n\
             Usa /info + ubicación (ej: y41) para obtener el texto guardado de esa ubicación.\n\
             Usa /export para obtener la base de datos de casillas en CSV.\n\
             Usa /set_language para cambiar el idioma del bot."
        }
        (Locale::Es, Fallback) => "ERROR:XXX>Lo siento, el texto solicitado no está disponible.",

        (Locale::Ru, Welcome) => "Добро пожаловать, {name}, в наш исследовательский центр!",
        (Locale::Ru, NoPermission) => "Извините, у вас нет разрешения на использование этого бота.",
        (Locale::Ru, ProvideLocation) => {
            "Пожалуйста, укажите местоположение в правильном формате (например, gy2)."
        }
        (Locale::Ru, SimpleInfoHeader) => "Местоположение: {location}",
        (Locale::Ru, SimpleInfoFooter) => "\nПрошло времени: {minutes} минут\nОпубликовано: {user}",
        (Locale::Ru, NoInfoFound) => "Информация по местоположению {location} не найдена.",
        (Locale::Ru, SavedSuccessfully) => {
            "Сохранено!\nМестоположение: {location}\nДетали цветов: {details}\nОпубликовано: {user}"
        }
        (Locale::Ru, MessageForwarded) => "Сообщение должно быть переслано от игрового бота!",
        (Locale::Ru, MessageInGroup) => "Отчет получен, спасибо за вашу помощь! 🫡",
        (Locale::Ru, ProcessingInfo) => "Обработка информации...",
        (Locale::Ru, InvalidMessage) => "Неверный формат сообщения!",
        (Locale::Ru, ExportError) => "Произошла ошибка: {error}",
        (Locale::Ru, Fallback) => "ERROR:XXX>Извините, запрашиваемый текст недоступен.",
        (Locale::Ru, HelpMessage) => {
            "Помощь:\n\
             Используйте /i + местоположение (например, gy2), чтобы получить полную информацию о конкретной клетке.\n\
             Используйте /info + местоположение (например, y41), чтобы получить сохраненный текст этого местоположения.\n\
             Используйте /export, чтобы получить базу данных клеток в формате CSV.\n\
             Используйте /set_language, чтобы изменить язык бота."
        }
    }
}

/// Fills `{name}` placeholders. Unknown placeholders are left in place.
fn render(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
}

pub fn get_text(locale: Locale, key: MessageKey, params: &[(&str, &str)]) -> String {
    render(template(locale, key), params)
}

/// Text for a key given by name. Unknown names resolve to the locale's fallback text.
pub fn get_text_by_name(locale: Locale, name: &str, params: &[(&str, &str)]) -> String {
    let key = MessageKey::from_name(name).unwrap_or_else(|| {
        log::debug!("no template named '{name}' for locale {}", locale.code());
        MessageKey::Fallback
    });
    get_text(locale, key, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled_by_name() {
        let text = get_text(Locale::En, MessageKey::NoInfoFound, &[("location", "gy2")]);
        assert_eq!(text, "No information found for location gy2.");
    }

    #[test]
    fn each_locale_has_its_own_wording() {
        let es = get_text(Locale::Es, MessageKey::SimpleInfoHeader, &[("location", "b7")]);
        let ru = get_text(Locale::Ru, MessageKey::SimpleInfoHeader, &[("location", "b7")]);
        assert_eq!(es, "Ubicación: b7");
        assert_eq!(ru, "Местоположение: b7");
    }

    #[test]
    fn multi_line_templates_keep_their_line_breaks() {
        let text = get_text(Locale::En, MessageKey::HelpMessage, &[]);
        assert!(text.starts_with("Help:\nUse /i + location"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn unknown_key_name_uses_fallback_text() {
        let text = get_text_by_name(Locale::Es, "does_not_exist", &[]);
        assert!(text.starts_with("ERROR:XXX>Lo siento"));
        assert_eq!(
            get_text_by_name(Locale::En, "invalid_message", &[]),
            "Invalid message format!"
        );
    }

    #[test]
    fn detects_locale_from_client_language_tag() {
        assert_eq!(Locale::detect(Some("es-AR")), Locale::Es);
        assert_eq!(Locale::detect(Some("RU")), Locale::Ru);
        assert_eq!(Locale::detect(Some("de")), Locale::En);
        assert_eq!(Locale::detect(None), Locale::En);
        assert_eq!(Locale::from_code("ES"), Some(Locale::Es));
        assert_eq!(Locale::from_code("pt"), None);
    }
}
