//! 内置祈祷文
//!
//! 每次初始化时从常量表重建，不持久化。

use super::PrayerRecord;

/// (id, title, text)
const BUILTIN_TABLE: &[(&str, &str, &str)] = &[
    (
        "salmo23",
        "Salmo 23",
        "El Señor es mi pastor, nada me falta;
en verdes praderas me hace recostar.

Me conduce hacia fuentes tranquilas
y repara mis fuerzas;
me guía por el sendero justo,
por el honor de su nombre.

Aunque camine por cañadas oscuras,
nada temo, porque tú vas conmigo:
tu vara y tu cayado me sosiegan.

Preparas una mesa ante mí,
enfrente de mis enemigos;
me unges la cabeza con perfume,
y mi copa rebosa.

Tu bondad y tu misericordia me acompañan
todos los días de mi vida,
y habitaré en la casa del Señor
por años sin término.",
    ),
    (
        "salmo91",
        "Salmo 91",
        "El que habita al abrigo del Altísimo
morará bajo la sombra del Omnipotente.
Diré yo a Jehová: Esperanza mía, y castillo mío;
Mi Dios, en quien confiaré.

El te librará del lazo del cazador,
De la peste destructora.
Con sus plumas te cubrirá,
Y debajo de sus alas estarás seguro;
Escudo y adarga es su verdad.

No temerás el terror nocturno,
Ni saeta que vuele de día,
Ni pestilencia que ande en oscuridad,
Ni mortandad que en medio del día destruya.",
    ),
    (
        "salmo121",
        "Salmo 121",
        "Alzaré mis ojos a los montes;
¿De dónde vendrá mi socorro?
Mi socorro viene de Jehová,
Que hizo los cielos y la tierra.

No dará tu pie al resbaladero,
Ni se dormirá el que te guarda.
He aquí, no se adormecerá ni dormirá
El que guarda a Israel.",
    ),
];

/// 默认选中的祈祷文
pub const DEFAULT_PRAYER_ID: &str = "salmo23";

/// 按表顺序返回全部内置祈祷文
pub fn builtin_prayers() -> Vec<PrayerRecord> {
    BUILTIN_TABLE
        .iter()
        .map(|(id, title, text)| PrayerRecord::builtin(id, title, text))
        .collect()
}

pub fn is_builtin_id(id: &str) -> bool {
    BUILTIN_TABLE.iter().any(|(builtin_id, _, _)| *builtin_id == id)
}
